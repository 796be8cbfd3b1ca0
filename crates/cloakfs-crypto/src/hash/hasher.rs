use sha2::{Digest as _, Sha512};

use crate::hash::{Digest, Hash, Salt};

pub fn hash(data: &[u8], salt: Salt) -> Hash {
    let mut hasher = Sha512::new();
    hasher.update(salt.get());
    hasher.update(data);
    let digest = Digest::new(hasher.finalize().into());

    Hash { digest, salt }
}
