use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::num::NonZeroU32;

use super::local_state_dir::LocalStateDir;
use crate::utils::write_atomically;

/// Id of a client (i.e. a machine) accessing a filesystem. Stored in the
/// filesystem's local state and, for single-client filesystems, pinned in the
/// config descriptor as the `exclusive_client_id`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ClientId {
    pub id: NonZeroU32,
}

/// Allocates a fresh client id.
///
/// Ids are allocated from a per-machine counter so they're monotone on one
/// machine and never handed out twice. The counter starts at a random
/// non-zero value so different machines get ids from different ranges, which
/// is what makes the single-client-mode check able to tell machines apart.
pub(super) fn allocate(local_state_dir: &LocalStateDir) -> Result<ClientId> {
    let counter_path = local_state_dir
        .for_client_id_counter()
        .context("Tried to determine location of the client id counter")?;
    let next = if counter_path.exists() {
        let file = std::fs::File::open(&counter_path)
            .context("Tried to open the client id counter")?;
        let counter: ClientIdCounter = serde_json::from_reader(BufReader::new(file))
            .context("Tried to read the client id counter")?;
        counter.next_client_id
    } else {
        rand::rng().random_range(1..=u32::MAX)
    };
    let id = NonZeroU32::new(next).context("Client id counter contained a zero id")?;

    let following = next.checked_add(1).unwrap_or(1);
    let counter_content = serde_json::to_vec_pretty(&ClientIdCounter {
        next_client_id: following,
    })
    .expect("Serializing the client id counter can't fail");
    write_atomically(&counter_path, &counter_content)
        .context("Tried to save the client id counter")?;

    Ok(ClientId { id })
}

#[derive(Serialize, Deserialize)]
struct ClientIdCounter {
    #[serde(rename = "nextClientId")]
    next_client_id: u32,
}
