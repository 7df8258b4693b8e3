use serde::{Deserialize, Serialize};

/// Handle returned by listener registration, used to unregister.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);
