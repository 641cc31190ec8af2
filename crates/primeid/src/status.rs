/// Outcome of returning an identifier to the allocator.
///
/// A release never blocks. When the pool has room the identifier becomes
/// available again; when it is at capacity the identifier is permanently lost.
///
/// # Example
///
/// ```no_run
/// use primeid::{Allocator, AllocatorConfig, ReleaseStatus};
///
/// # async fn run() -> primeid::Result<()> {
/// let allocator = Allocator::start(AllocatorConfig::default())?;
/// let id = allocator.allocate().await?;
/// match allocator.release(id)? {
///     ReleaseStatus::Recycled => println!("{id} can be issued again"),
///     ReleaseStatus::Dropped => println!("{id} is gone for good"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseStatus {
    /// The identifier was placed back in the pool.
    Recycled,
    /// The pool was full and the identifier was discarded.
    Dropped,
}

impl ReleaseStatus {
    /// Returns `true` if the identifier was lost.
    pub const fn is_dropped(self) -> bool {
        matches!(self, Self::Dropped)
    }
}
