use lootcase_core::{
    Case, Catalog, EconomyConfig, ItemTemplate, MemoryStore, Money, Rarity, ReplayRng, Session,
    BALANCE_KEY,
};

fn skin(weapon: &str, name: &str, rarity: Rarity, cents: u64) -> ItemTemplate {
    ItemTemplate {
        name: format!("{weapon} | {name}"),
        weapon: weapon.to_string(),
        skin: name.to_string(),
        rarity,
        price: Money::from_cents(cents),
        is_knife: false,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog {
        cases: vec![Case {
            id: 1,
            name: "Recoil Case".to_string(),
            price: Money::from_cents(249),
            skins: vec![
                skin("P250", "Visions", Rarity::MilSpec, 35),
                skin("AK-47", "Ice Coaled", Rarity::Classified, 1_250),
                skin("AWP", "Chromatic Aberration", Rarity::Covert, 6_400),
            ],
        }],
    };
    let rng = ReplayRng::new("example-seed", 1);
    println!("seed hash {}", rng.seed_hash_hex());

    let mut session = Session::start(MemoryStore::new(), catalog, EconomyConfig::default(), rng)?;
    for _ in 0..5 {
        let opening = session.open_case(1)?;
        session.settle();
        println!(
            "{} ({}) balance={}",
            opening.item.name, opening.item.rarity, opening.balance
        );
    }

    println!(
        "stored balance {}",
        session.ledger().store().get(BALANCE_KEY).unwrap_or("-")
    );

    let Some(target) = session.ledger().state().upgrade_candidates().next().map(|i| i.id) else {
        return Ok(());
    };
    let outcome = session.upgrade(&[target], Some(60))?;
    session.settle();
    println!(
        "upgrade chance={} roll={:.2} success={}",
        outcome.chance, outcome.roll, outcome.success
    );
    Ok(())
}
