// LNP/BP Core Library implementing LNPBP specifications & standards
// Written in 2020-2022 by
//     Dr. Maxim Orlovsky <orlovsky@pandoracore.com>
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the MIT License
// along with this software.
// If not, see <https://opensource.org/licenses/MIT>.

//! Compressed storage for the per-commitment secrets our peer reveals to us
//! on each `revoke_and_ack` (spec §3 `per_commitment_secrets`, up to 2^48
//! leaves). Storing all of them would be unbounded; the BOLT-3 "shachain"
//! scheme keeps at most 49 secrets by exploiting that a secret at a lower
//! commitment index can be re-derived from any later secret sharing its
//! higher-order index bits.
//!
//! Our own per-commitment secrets for indexes beyond the first descend from
//! a single per-channel seed via [`generate_secret`], the same bit-flip/hash
//! construction used for the remote store below; [`crate::keyset::LocalKeyset`]
//! only fixes the seed's index-0 output via BIP32.

use bitcoin::hashes::{sha256, Hash, HashEngine};
use secp256k1::{PublicKey, Secp256k1, SecretKey};

/// Number of significant bits in a commitment index (spec: "2^48 leaves").
const INDEX_BITS: u32 = 48;
/// One bucket per possible count of trailing zero bits, plus the all-zero
/// index itself.
const BUCKETS: usize = INDEX_BITS as usize + 1;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum ShaChainError {
    /// revealed secret for commitment index {index} does not derive the
    /// previously stored secret for index {stored_index}; peer is either
    /// buggy or malicious
    Inconsistent { index: u64, stored_index: u64 },

    /// commitment index {0} exceeds the 48-bit range supported by the
    /// compressed secret store
    IndexOutOfRange(u64),
}

fn flip_bit(mut buf: [u8; 32], bit: u32) -> [u8; 32] {
    let byte = 31 - (bit / 8) as usize;
    let bitpos = bit % 8;
    buf[byte] ^= 1 << bitpos;
    buf
}

fn hash(buf: [u8; 32]) -> [u8; 32] {
    let mut engine = sha256::Hash::engine();
    engine.input(&buf);
    sha256::Hash::from_engine(engine).into_inner()
}

/// Derives the secret for `to_index` from a secret known to be valid at
/// `from_index`, or returns `None` if `to_index` does not lie in the subtree
/// `from_index` can reach (i.e. the two indexes disagree above the lowest set
/// bit of `from_index`).
fn derive(mut secret: [u8; 32], from_index: u64, to_index: u64) -> Option<[u8; 32]> {
    let lowest = from_index.trailing_zeros().min(INDEX_BITS);
    let mask: u64 = if lowest >= INDEX_BITS {
        0
    } else {
        (!0u64 << lowest) & ((1u64 << INDEX_BITS) - 1)
    };
    if from_index & mask != to_index & mask {
        return None;
    }
    for bit in (0..lowest).rev() {
        if (to_index >> bit) & 1 == 1 {
            secret = hash(flip_bit(secret, bit));
        }
    }
    Some(secret)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Bucket {
    index: u64,
    secret: [u8; 32],
}

/// Compressed store of the per-commitment secrets revealed to us by the
/// remote peer, one per successfully revoked commitment index.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ShaChainStore {
    buckets: [Option<Bucket>; BUCKETS],
}

impl ShaChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the secret the peer revealed for `index`, verifying it is
    /// consistent with every secret already on file that it can re-derive.
    /// This is the enforcement point for invariant I4: a peer can never
    /// later reveal a different secret for an index we already hold.
    pub fn insert_secret(
        &mut self,
        index: u64,
        secret: SecretKey,
    ) -> Result<(), ShaChainError> {
        if index >= 1u64 << INDEX_BITS {
            return Err(ShaChainError::IndexOutOfRange(index));
        }
        let bucket = index.trailing_zeros().min(INDEX_BITS) as usize;
        let raw = secret_to_bytes(secret);
        for stored in self.buckets[..bucket].iter().flatten() {
            match derive(raw, index, stored.index) {
                Some(derived) if derived == stored.secret => {}
                _ => {
                    return Err(ShaChainError::Inconsistent {
                        index,
                        stored_index: stored.index,
                    })
                }
            }
        }
        self.buckets[bucket] = Some(Bucket { index, secret: raw });
        Ok(())
    }

    /// Recovers the secret for `index`, if it was revealed (directly or
    /// derivable from a later revealed secret).
    pub fn get_secret(&self, index: u64) -> Option<SecretKey> {
        self.buckets.iter().flatten().find_map(|stored| {
            derive(stored.secret, stored.index, index)
                .and_then(|raw| SecretKey::from_slice(&raw).ok())
        })
    }

    /// `true` once at least one secret has been recorded.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Option::is_none)
    }
}

fn secret_to_bytes(secret: SecretKey) -> [u8; 32] {
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&secret.secret_bytes());
    buf
}

/// Highest representable commitment index; our own per-commitment secrets
/// are generated as if derived from a secret held at this index, so every
/// other index is reachable by [`derive`].
const MAX_INDEX: u64 = (1u64 << INDEX_BITS) - 1;

/// Derives our own per-commitment secret for `index` from the channel's
/// per-commitment seed, counting down from [`MAX_INDEX`] the same way the
/// remote party's revealed secrets do in [`ShaChainStore`].
pub fn generate_secret(seed: [u8; 32], index: u64) -> SecretKey {
    let raw = derive(seed, MAX_INDEX, index)
        .expect("every index is reachable from MAX_INDEX");
    SecretKey::from_slice(&raw).expect("sha256 output is a valid scalar with overwhelming probability")
}

/// Derives the public per-commitment point for `index`, as announced in
/// `open_channel`/`accept_channel`/`funding_locked`/`revoke_and_ack`.
pub fn generate_point<C: secp256k1::Signing>(
    secp: &Secp256k1<C>,
    seed: [u8; 32],
    index: u64,
) -> PublicKey {
    PublicKey::from_secret_key(secp, &generate_secret(seed, index))
}

#[cfg(test)]
mod test {
    use super::*;

    fn seckey(byte: u8) -> SecretKey {
        SecretKey::from_slice(&[byte; 32]).unwrap()
    }

    #[test]
    fn derive_reaches_indexes_below_lowest_set_bit() {
        // A secret revealed at index 8 (0b1000, lowest set bit at position
        // 3) must be able to derive the secret for index 10 (0b1010), which
        // shares every bit at or above position 3.
        let secret = [9u8; 32];
        let derived = derive(secret, 8, 10);
        assert!(derived.is_some());
        assert_ne!(derived.unwrap(), secret);
    }

    #[test]
    fn derive_rejects_unrelated_index() {
        let secret = [9u8; 32];
        // Index 4 does not have bit 3 set, so it cannot share index 8's
        // prefix at or above its lowest set bit.
        assert!(derive(secret, 8, 4).is_none());
    }

    #[test]
    fn store_rejects_inconsistent_secret() {
        let mut store = ShaChainStore::new();
        store.insert_secret(8, seckey(1)).unwrap();
        // A bogus secret for index 10 that does not derive to what we
        // already hold must be rejected.
        let err = store.insert_secret(10, seckey(2));
        assert!(err.is_err());
    }

    #[test]
    fn store_roundtrips_single_secret() {
        let mut store = ShaChainStore::new();
        let secret = seckey(42);
        store.insert_secret(100, secret).unwrap();
        assert_eq!(store.get_secret(100), Some(secret));
        assert!(!store.is_empty());
    }

    #[test]
    fn generate_secret_is_deterministic_and_varies_by_index() {
        let seed = [3u8; 32];
        assert_eq!(generate_secret(seed, 0), generate_secret(seed, 0));
        assert_ne!(generate_secret(seed, 0), generate_secret(seed, 1));
    }

    #[test]
    fn generated_secrets_are_consistent_with_the_store() {
        // Secrets generated for our own channel must satisfy the exact same
        // derivability relationship the remote store enforces on revealed
        // ones, since both use the same construction over a 48-bit index.
        let seed = [5u8; 32];
        let mut store = ShaChainStore::new();
        for index in [8u64, 10, 12, 100] {
            store.insert_secret(index, generate_secret(seed, index)).unwrap();
        }
    }
}
