// ABOUTME: Entity id generation
// ABOUTME: Prefixed nanoid identifiers shared by all storage layers

/// Generate an entity id with a short type prefix, e.g. `task-V1StGXR8_Z5jdHi6B-myT`
pub fn prefixed_id(prefix: &str) -> String {
    format!("{}-{}", prefix, nanoid::nanoid!())
}
