//! Result-set lifecycle seam.

/// A result set the session closes as soon as the statement ends, so
/// temporary files are deleted as early as possible.
pub trait TemporaryResult: Send + Sync {
    /// The result holds resources that need closing.
    fn needs_close(&self) -> bool;

    /// Release the result's resources.
    fn close(&self);
}
