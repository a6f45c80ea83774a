use {
    crate::{RingError, RingResult},
    auto_impl::auto_impl,
    rapidhash::v3::rapidhash_v3,
    sha2::{Digest, Sha256},
    std::{fmt, str::FromStr},
};

/// Hash function that places node replicas and keys on the ring.
///
/// Implementations must be deterministic: the same input must produce the
/// same output across calls, processes and platforms. Only the lowest
/// [`output_bits()`](Self::output_bits) bits of the result may be set.
#[auto_impl(&, Box, Arc)]
pub trait RingHasher: Send + Sync {
    /// Width of the hash output in bits (at most 64).
    fn output_bits(&self) -> u32;

    /// Hashes the given bytes.
    fn hash_bytes(&self, bytes: &[u8]) -> u64;
}

/// Built-in hash algorithms, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// SHA-256, first eight bytes of the digest read as big-endian.
    #[default]
    Sha256,

    /// 32-bit FNV-1a.
    Fnv1a,

    /// rapidhash V3 with the default seed and secrets.
    Rapidhash,
}

impl HashAlgorithm {
    /// All built-in algorithms.
    pub const ALL: [HashAlgorithm; 3] = [Self::Sha256, Self::Fnv1a, Self::Rapidhash];

    /// Canonical name of the algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Fnv1a => "fnv1a",
            Self::Rapidhash => "rapidhash",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = RingError;

    fn from_str(s: &str) -> RingResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "fnv1a" | "fnv1a32" | "fast32" => Ok(Self::Fnv1a),
            "rapidhash" | "fast64" => Ok(Self::Rapidhash),
            _ => Err(RingError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl RingHasher for HashAlgorithm {
    fn output_bits(&self) -> u32 {
        match self {
            Self::Sha256 | Self::Rapidhash => 64,
            Self::Fnv1a => 32,
        }
    }

    fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        match self {
            Self::Sha256 => sha256_prefix(bytes),
            Self::Fnv1a => fnv1a_32(bytes) as u64,
            Self::Rapidhash => rapidhash_v3(bytes),
        }
    }
}

fn sha256_prefix(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ *byte as u32).wrapping_mul(FNV_PRIME)
    })
}
