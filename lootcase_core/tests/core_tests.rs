use lootcase_core::{
    draw_item, drop_odds, Case, Catalog, EconomyConfig, ItemTemplate, Ledger,
    LootError, MemoryStore, Money, Rarity, RarityTable, ReplayRng, Session, SqliteStore,
    UpgradeEngine, BALANCE_KEY, INVENTORY_KEY,
};
use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use std::collections::HashSet;

fn skin(name: &str, rarity: Rarity, cents: u64) -> ItemTemplate {
    ItemTemplate {
        name: name.to_string(),
        weapon: "AK-47".to_string(),
        skin: name.to_string(),
        rarity,
        price: Money::from_cents(cents),
        is_knife: false,
    }
}

fn scenario_case() -> Case {
    let mut skins: Vec<ItemTemplate> = (0..20)
        .map(|i| skin(&format!("Consumer {i}"), Rarity::ConsumerGrade, 5))
        .collect();
    skins.push(skin("Fire Serpent", Rarity::Covert, 45_000));
    Case {
        id: 7,
        name: "Operation Case".to_string(),
        price: Money::from_cents(249),
        skins,
    }
}

#[test]
fn scenario_case_opening_spends_exact_balance() {
    let store = MemoryStore::with_entries([(BALANCE_KEY, "2.49")]);
    let catalog = Catalog {
        cases: vec![scenario_case()],
    };
    let mut session = Session::start(
        store,
        catalog,
        EconomyConfig::default(),
        StdRng::seed_from_u64(2024),
    )
    .unwrap();

    let odds = session.odds(7).unwrap();
    let covert = odds.iter().find(|o| o.rarity == Rarity::Covert).unwrap();
    assert_eq!(covert.weight, 10);
    assert!((covert.probability - 10.0 / 120_010.0).abs() < 1e-12);

    let opening = session.open_case(7).unwrap();
    assert_eq!(opening.balance, Money::ZERO);
    assert_eq!(session.balance(), Money::ZERO);
    assert_eq!(session.inventory().len(), 1);
    assert_eq!(session.ledger().store().get(BALANCE_KEY), Some("0.00"));

    session.settle();
    assert!(matches!(
        session.open_case(7),
        Err(LootError::InsufficientFunds { .. })
    ));
    assert_eq!(session.inventory().len(), 1);
}

#[test]
fn weighting_matches_rarity_weights() {
    let case = Case {
        id: 1,
        name: "Every tier".to_string(),
        price: Money::from_cents(100),
        skins: vec![
            skin("consumer", Rarity::ConsumerGrade, 1),
            skin("industrial", Rarity::IndustrialGrade, 1),
            skin("milspec", Rarity::MilSpec, 1),
            skin("restricted", Rarity::Restricted, 1),
            skin("classified", Rarity::Classified, 1),
            skin("covert", Rarity::Covert, 1),
        ],
    };
    let table = RarityTable::reference();
    let total: u64 = case
        .skins
        .iter()
        .map(|s| u64::from(table.weight(s.rarity)))
        .sum();
    assert_eq!(total, 10_000);

    const DRAWS: u64 = 200_000;
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut counts = [0u64; 7];
    for _ in 0..DRAWS {
        let item = draw_item(&case, &table, &mut rng).unwrap();
        counts[usize::from(item.rarity.to_index())] += 1;
    }

    let chi_squared: f64 = case
        .skins
        .iter()
        .map(|s| {
            let expected = DRAWS as f64 * f64::from(table.weight(s.rarity)) / total as f64;
            let observed = counts[usize::from(s.rarity.to_index())] as f64;
            (observed - expected).powi(2) / expected
        })
        .sum();
    // df = 5
    assert!(chi_squared < 35.0, "chi-squared {chi_squared}");
    assert_eq!(counts[usize::from(Rarity::RareSpecial.to_index())], 0);
}

#[test]
fn drop_odds_sum_to_one() {
    let odds = drop_odds(&scenario_case(), &RarityTable::reference());
    let total: f64 = odds.iter().map(|o| o.probability).sum();
    assert!((total - 1.0).abs() < 1e-12);
}

#[test]
fn bootstrap_defaults_on_first_run() {
    let ledger = Ledger::bootstrap(MemoryStore::new(), EconomyConfig::default().starting_balance)
        .unwrap();
    assert_eq!(ledger.balance().to_string(), "500.00");
    assert!(ledger.inventory().is_empty());
    assert_eq!(ledger.store().get(BALANCE_KEY), Some("500.00"));
    assert_eq!(ledger.store().get(INVENTORY_KEY), Some("[]"));
}

#[test]
fn corrupt_inventory_recovers_to_empty() {
    let store = MemoryStore::with_entries([(BALANCE_KEY, "12.00"), (INVENTORY_KEY, "[{oops")]);
    let ledger = Ledger::bootstrap(store, Money::from_cents(50_000)).unwrap();
    assert_eq!(ledger.balance(), Money::from_cents(1200));
    assert!(ledger.inventory().is_empty());
}

#[test]
fn zero_manual_chance_clamps_to_one_percent() {
    let store = MemoryStore::with_entries([(BALANCE_KEY, "0.00")]);
    let mut ledger = Ledger::bootstrap(store, Money::ZERO).unwrap();
    let config = EconomyConfig::default();
    let mut engine = UpgradeEngine::new();
    let mut rng = StdRng::seed_from_u64(99);

    const TRIALS: usize = 10_000;
    let mut successes = 0;
    for _ in 0..TRIALS {
        let item = ledger.add_item(&skin("Redline", Rarity::Classified, 100)).unwrap();
        engine.select(&ledger, item.id).unwrap();
        engine.set_manual_chance(Some(0)).unwrap();
        let outcome = engine.resolve(&mut ledger, &config, &mut rng).unwrap();
        assert_eq!(outcome.chance, 1);
        if outcome.success {
            successes += 1;
            assert!(outcome.items_lost.is_empty());
        } else {
            assert_eq!(outcome.items_lost.len(), 1);
        }
        engine.acknowledge();
    }
    // expected 100, standard deviation ~10
    assert!((40..=170).contains(&successes), "successes {successes}");
}

#[test]
fn full_manual_chance_always_promotes() {
    let store = MemoryStore::with_entries([(BALANCE_KEY, "0.00")]);
    let mut ledger = Ledger::bootstrap(store, Money::ZERO).unwrap();
    let config = EconomyConfig::default();
    let mut engine = UpgradeEngine::new();
    let mut rng = StdRng::seed_from_u64(1);

    for _ in 0..500 {
        let item = ledger.add_item(&skin("Asiimov", Rarity::ConsumerGrade, 249)).unwrap();
        engine.select(&ledger, item.id).unwrap();
        engine.set_manual_chance(Some(100)).unwrap();
        let outcome = engine.resolve(&mut ledger, &config, &mut rng).unwrap();
        assert!(outcome.success);
        let promoted = outcome.promoted.unwrap();
        assert_eq!(promoted.id, item.id);
        assert_eq!(promoted.rarity, Rarity::IndustrialGrade);
        assert_eq!(promoted.price, Money::from_cents(622));
        engine.acknowledge();
    }
    assert_eq!(ledger.inventory().len(), 500);
}

#[test]
fn failed_upgrade_removes_min_of_selection_and_three() {
    let mut config = EconomyConfig::default();
    config.rarity.chances.insert(Rarity::MilSpec, 0);
    for k in 1..=6usize {
        let store = MemoryStore::with_entries([(BALANCE_KEY, "0.00")]);
        let mut ledger = Ledger::bootstrap(store, Money::ZERO).unwrap();
        let mut engine = UpgradeEngine::new();
        let mut rng = StdRng::seed_from_u64(k as u64);
        // one unselected bystander must survive
        let bystander = ledger.add_item(&skin("bystander", Rarity::MilSpec, 1)).unwrap();
        for i in 0..k {
            let item = ledger.add_item(&skin(&format!("fuel {i}"), Rarity::MilSpec, 1)).unwrap();
            engine.select(&ledger, item.id).unwrap();
        }
        let outcome = engine.resolve(&mut ledger, &config, &mut rng).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.items_lost.len(), k.min(3));
        assert_eq!(ledger.inventory().len(), 1 + k - k.min(3));
        assert!(ledger.item(bystander.id).is_some());
    }
}

#[test]
fn replayed_seed_reproduces_session() {
    let run = || {
        let store = MemoryStore::with_entries([(BALANCE_KEY, "100.00")]);
        let catalog = Catalog {
            cases: vec![scenario_case()],
        };
        let mut session =
            Session::start(store, catalog, EconomyConfig::default(), ReplayRng::new("seed", 3))
                .unwrap();
        (0..20)
            .map(|_| {
                let name = session.open_case(7).unwrap().item.name;
                session.settle();
                name
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn sqlite_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lootcase.db");
    let catalog = Catalog {
        cases: vec![scenario_case()],
    };

    let (balance, inventory) = {
        let store = SqliteStore::open(&path).unwrap();
        let mut session = Session::start(
            store,
            catalog.clone(),
            EconomyConfig::default(),
            StdRng::seed_from_u64(8),
        )
        .unwrap();
        session.open_case(7).unwrap();
        session.settle();
        session.open_case(7).unwrap();
        (session.balance(), session.inventory().to_vec())
    };
    assert_eq!(balance, Money::from_cents(50_000 - 2 * 249));

    let store = SqliteStore::open(&path).unwrap();
    let session = Session::start(
        store,
        catalog,
        EconomyConfig::default(),
        StdRng::seed_from_u64(9),
    )
    .unwrap();
    assert_eq!(session.balance(), balance);
    assert_eq!(session.inventory(), inventory.as_slice());
}

#[test]
fn shared_database_keeps_both_clients_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lootcase.db");
    let start = EconomyConfig::default().starting_balance;
    let mut cli = Ledger::bootstrap(SqliteStore::open(&path).unwrap(), start).unwrap();
    let mut server = Ledger::bootstrap(SqliteStore::open(&path).unwrap(), start).unwrap();

    cli.debit(Money::from_cents(249)).unwrap();
    let bought = cli.add_item(&skin("Hyper Beast", Rarity::Covert, 3_000)).unwrap();
    // this ledger has not seen the purchase yet
    let balance = server.credit(Money::from_cents(100)).unwrap();
    assert_eq!(balance, Money::from_cents(50_000 - 249 + 100));
    assert_eq!(server.inventory(), std::slice::from_ref(&bought));

    let reloaded = Ledger::bootstrap(SqliteStore::open(&path).unwrap(), start).unwrap();
    assert_eq!(reloaded.balance().to_string(), "498.51");
    assert_eq!(reloaded.inventory(), std::slice::from_ref(&bought));

    cli.refresh().unwrap();
    assert_eq!(cli.balance(), reloaded.balance());
}

#[derive(Debug, Clone)]
enum Op {
    Debit(u64),
    Credit(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..20_000).prop_map(Op::Debit),
        (0u64..20_000).prop_map(Op::Credit),
    ]
}

proptest! {
    #[test]
    fn prop_balance_never_negative(start in 0u64..50_000, ops in prop::collection::vec(op_strategy(), 0..64)) {
        let balance = Money::from_cents(start).to_string();
        let store = MemoryStore::with_entries([(BALANCE_KEY, balance.as_str())]);
        let mut ledger = Ledger::bootstrap(store, Money::ZERO).unwrap();
        let mut model = i128::from(start);
        for op in ops {
            match op {
                Op::Debit(cents) => {
                    let result = ledger.debit(Money::from_cents(cents));
                    if i128::from(cents) <= model {
                        prop_assert!(result.is_ok());
                        model -= i128::from(cents);
                    } else {
                        let rejected = matches!(result, Err(LootError::InsufficientFunds { .. }));
                        prop_assert!(rejected);
                    }
                }
                Op::Credit(cents) => {
                    ledger.credit(Money::from_cents(cents)).unwrap();
                    model += i128::from(cents);
                }
            }
            prop_assert!(model >= 0);
            prop_assert_eq!(i128::from(ledger.balance().cents()), model);
        }
    }

    #[test]
    fn prop_inventory_ids_unique(actions in prop::collection::vec(any::<bool>(), 1..80)) {
        let store = MemoryStore::with_entries([(BALANCE_KEY, "0.00")]);
        let mut ledger = Ledger::bootstrap(store, Money::ZERO).unwrap();
        let mut issued = HashSet::new();
        for add in actions {
            if add || ledger.inventory().is_empty() {
                let item = ledger.add_item(&skin("x", Rarity::MilSpec, 1)).unwrap();
                prop_assert!(issued.insert(item.id));
            } else {
                let id = ledger.inventory()[0].id;
                ledger.remove_item(id).unwrap();
            }
            let live: HashSet<u64> = ledger.inventory().iter().map(|i| i.id).collect();
            prop_assert_eq!(live.len(), ledger.inventory().len());
        }
    }
}

#[test]
fn bundled_data_files_load() {
    let root = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");
    let catalog = Catalog::load(format!("{root}/cases.json")).unwrap();
    assert!(catalog.case(1).is_some());
    assert!(catalog.cases.iter().all(|case| !case.skins.is_empty()));

    let config = EconomyConfig::load(format!("{root}/economy.json")).unwrap();
    assert_eq!(config, EconomyConfig::default());
}
