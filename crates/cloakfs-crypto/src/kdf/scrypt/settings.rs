/// Cost settings for an scrypt key derivation.
///
/// The derivation's peak memory usage follows from the parameters (see
/// [`ScryptSettings::memory_usage_bytes`]), and its runtime scales roughly
/// linearly with that memory. The outer key only protects the config
/// descriptor, but that descriptor contains the inner filesystem key, so the
/// derivation cost is the main line of defense against offline password
/// guessing by whoever controls the basedir.
#[derive(Debug, Clone, Copy)]
pub struct ScryptSettings {
    /// CPU/memory cost, as log2 of the scrypt `N` parameter. Must be < 64.
    pub log_n: u8,
    /// Block size parameter `r`.
    pub r: u32,
    /// Parallelization parameter `p`.
    pub p: u32,
    /// Number of random salt bytes to generate.
    pub salt_len: usize,
}

impl ScryptSettings {
    /// Hardest preset, ~17GB of memory per derivation. Opening the filesystem
    /// takes minutes even on fast hardware; for users whose adversary is
    /// assumed to have serious password-cracking infrastructure.
    pub const PARANOID: Self = Self {
        log_n: 24,
        r: 8,
        p: 2,
        salt_len: 32,
    };

    /// Preset used for new filesystems, ~1GB of memory per derivation.
    pub const DEFAULT: Self = Self {
        log_n: 20,
        r: 8,
        p: 8,
        salt_len: 32,
    };

    /// Preset for memory-constrained devices, ~0.5GB per derivation. Weaker
    /// against cracking hardware than [`ScryptSettings::DEFAULT`], so only
    /// for machines where the default doesn't fit.
    pub const LOW_MEMORY: Self = Self {
        log_n: 20,
        r: 4,
        p: 4,
        salt_len: 32,
    };

    /// Fast preset (~128kB) for tests and examples only. This can't be gated
    /// behind `cfg(test)` because test code of dependent crates needs it too.
    pub const TEST: Self = Self {
        log_n: 10,
        r: 1,
        // p and r deliberately differ so accidentally swapped parameters
        // would show up in tests
        p: 2,
        salt_len: 32,
    };

    /// Approximate peak memory usage of a single-threaded derivation with
    /// these settings, in bytes.
    pub fn memory_usage_bytes(&self) -> u64 {
        // 128 * r * (n + p + 1), from reading the scrypt crate's
        // implementation at
        // <https://github.com/RustCrypto/password-hashes/blob/master/scrypt/src/lib.rs>
        128 * u64::from(self.r) * ((1u64 << self.log_n) + u64::from(self.p) + 1)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::ScryptSettings;
    use crate::kdf::scrypt::ScryptParams;

    #[rstest]
    fn params_are_valid(
        #[values(
            ScryptSettings::PARANOID,
            ScryptSettings::DEFAULT,
            ScryptSettings::LOW_MEMORY,
            ScryptSettings::TEST
        )]
        settings: ScryptSettings,
    ) {
        let params = ScryptParams::generate(&settings).unwrap();
        scrypt::Params::new(params.log_n(), params.r(), params.p(), 32)
            .expect("Invalid scrypt parameters");
    }

    #[test]
    fn presets_are_ordered_by_cost() {
        assert!(
            ScryptSettings::TEST.memory_usage_bytes()
                < ScryptSettings::LOW_MEMORY.memory_usage_bytes()
        );
        assert!(
            ScryptSettings::LOW_MEMORY.memory_usage_bytes()
                < ScryptSettings::DEFAULT.memory_usage_bytes()
        );
        assert!(
            ScryptSettings::DEFAULT.memory_usage_bytes()
                < ScryptSettings::PARANOID.memory_usage_bytes()
        );
    }

    #[test]
    fn test_preset_is_cheap_enough_for_tests() {
        // Tests run many derivations, keep this well below a megabyte
        assert!(ScryptSettings::TEST.memory_usage_bytes() < 1024 * 1024);
    }

    #[test]
    fn default_preset_memory_usage() {
        // ~1GB, see the preset docs. If this changes, the docs above and the
        // user documentation need an update.
        let gigabyte = 1024 * 1024 * 1024;
        let usage = ScryptSettings::DEFAULT.memory_usage_bytes();
        assert!(usage >= gigabyte && usage < 2 * gigabyte);
    }
}
