use kernel::id::Id;

pub struct SessionMarker;
/// Identifies one refresh-token lineage; embedded in access tokens as `sid`
pub type SessionId = Id<SessionMarker>;
