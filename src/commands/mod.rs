pub mod admin_test;
pub mod debug;

use crate::command::CommandRegistry;
use crate::core::Result;

/// Registers every built-in command. Called once at startup; a duplicate
/// name in the static set fails the whole startup.
pub fn register_builtins(registry: &mut CommandRegistry) -> Result<()> {
    registry.register(debug::descriptor())?;
    registry.register(admin_test::descriptor())?;
    Ok(())
}
