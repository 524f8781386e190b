//! Registry trait implemented by every pluggable backend.

/// Ties an implementation's configuration key to its factory function.
///
/// Each backend module exposes a zero-sized `Registry` type implementing this
/// trait so the catalog can discover `(name, factory)` pairs without a
/// hand-maintained match statement.
pub trait ImplementationRegistry {
	/// Configuration key under which the implementation is registered.
	const NAME: &'static str;
	/// Human readable label shown in selection prompts.
	const LABEL: &'static str;
	/// Factory function type producing the implementation.
	type Factory;

	/// Returns the factory function for this implementation.
	fn factory() -> Self::Factory;
}
