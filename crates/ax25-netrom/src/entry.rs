/// Where an entry's evidence came from (spec §3 `sourceType`). Passive
/// inference only ever produces `Classic` (heard directly) and
/// `Inferred` (heard via a digipeater path); `Broadcast` is reserved for
/// a future real NET/ROM routing-broadcast listener, out of scope per
/// spec.md's Non-goals, but kept in the enum so that listener would
/// slot in without a breaking change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Broadcast,
    Classic,
    Inferred,
}
