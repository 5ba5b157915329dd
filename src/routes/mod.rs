/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated
/// modules, so access control is applied explicitly at the module level (via
/// Axum layers) rather than rediscovered per handler.
///
/// The two modules map directly to the defined access levels.

/// Routes accessible to all clients (anonymous or logged-in, read-only).
/// Handlers resolve the viewer softly and enforce the owner-or-public rule
/// at the Repository level.
pub mod public;

/// Routes protected by the `AuthViewer` extractor middleware.
/// Requires a validated session.
pub mod authenticated;
