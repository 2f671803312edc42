use uuid::Uuid;

/// Mint a fresh document (form) id
pub fn new_form_id() -> String {
    Uuid::new_v4().to_string()
}

/// Random short seed, unique per editing session
pub fn new_seed() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Sequential ID generator for nodes within a session
#[derive(Debug, Clone)]
pub struct IDGenerator {
    seed: String, // Random per generator
    count: u32,   // Sequential counter
}

impl IDGenerator {
    pub fn new() -> Self {
        Self::from_seed(new_seed())
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
        }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}

impl Default for IDGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let mut gen = IDGenerator::from_seed("abc");

        let id1 = gen.new_id();
        let id2 = gen.new_id();
        let id3 = gen.new_id();

        assert_eq!(id1, "abc-1");
        assert_eq!(id2, "abc-2");
        assert_eq!(id3, "abc-3");
    }

    #[test]
    fn test_random_seeds_differ() {
        let a = IDGenerator::new();
        let b = IDGenerator::new();

        assert_eq!(a.seed().len(), 8);
        assert_ne!(a.seed(), b.seed());
    }

    #[test]
    fn test_form_ids_are_uuids() {
        let id = new_form_id();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_ne!(id, new_form_id());
    }
}
