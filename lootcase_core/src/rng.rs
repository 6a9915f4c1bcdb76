use hmac::{Hmac, Mac};
use rand::{Error, RngCore};
use sha2::Sha256;

// Replayable randomness: seed (secret) + nonce + block counter -> HMAC-SHA256 -> byte stream.
// The same seed and nonce always reproduce the same session draws.

pub type HmacSha256 = Hmac<Sha256>;

pub fn derive_hash_hex(input: &[u8]) -> String {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

pub struct ReplayRng {
    seed: String,
    nonce: u64,
    block: u64,
    buffer: [u8; 32],
    offset: usize,
}

impl ReplayRng {
    pub fn new(seed: impl Into<String>, nonce: u64) -> Self {
        let mut rng = Self {
            seed: seed.into(),
            nonce,
            block: 0,
            buffer: [0u8; 32],
            offset: 0,
        };
        rng.buffer = rng.block_bytes(0);
        rng
    }

    /// Hash of the seed, safe to show before the seed itself is revealed.
    pub fn seed_hash_hex(&self) -> String {
        derive_hash_hex(self.seed.as_bytes())
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    fn block_bytes(&self, block: u64) -> [u8; 32] {
        let mut mac =
            HmacSha256::new_from_slice(self.seed.as_bytes()).expect("HMAC accepts any key length");
        let msg = format!("{}:{}", self.nonce, block);
        mac.update(msg.as_bytes());
        let res = mac.finalize().into_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&res);
        out
    }

    fn refill(&mut self) {
        self.block += 1;
        self.buffer = self.block_bytes(self.block);
        self.offset = 0;
    }
}

impl RngCore for ReplayRng {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill_bytes(&mut bytes);
        u32::from_be_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut written = 0;
        while written < dest.len() {
            if self.offset == self.buffer.len() {
                self.refill();
            }
            let take = (dest.len() - written).min(self.buffer.len() - self.offset);
            dest[written..written + take]
                .copy_from_slice(&self.buffer[self.offset..self.offset + take]);
            self.offset += take;
            written += take;
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
