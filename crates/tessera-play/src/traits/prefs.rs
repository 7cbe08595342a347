/// Simple key-value preference store.
///
/// Only two facts persist across sessions: the last quality the user picked
/// and whether loop mode is on.
#[cfg_attr(
    any(test, feature = "test-utils"),
    unimock::unimock(api = PreferencesMock)
)]
pub trait Preferences: Send + Sync + 'static {
    fn preferred_quality(&self) -> Option<String>;

    fn set_preferred_quality(&self, label: &str);

    fn loop_enabled(&self) -> bool;

    fn set_loop_enabled(&self, enabled: bool);
}
