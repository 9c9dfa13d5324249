use std::process::Command;
use std::thread;
use tracing::{debug, error, info};

pub fn execute_command(command: &str) -> Result<String, Box<dyn std::error::Error>> {
    debug!("Executing command: {}", command);
    let output = Command::new("sh").arg("-c").arg(command).output()?;

    if output.status.success() {
        let result = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("Command output: {}", result);
        Ok(result)
    } else {
        let error_msg = format!("Command failed with exit code: {:?}", output.status.code());
        debug!(
            "Command stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        Err(error_msg.into())
    }
}

/// Button action that runs `command` on a worker thread, so a slow command
/// never stalls the run loop that dispatched the press.
pub fn spawn_on_press(command: String) -> impl Fn(&str) + Send + Sync + 'static {
    move |payload: &str| {
        info!("Button pressed ({}), executing: {}", payload, command);
        let command = command.clone();
        let spawned = thread::Builder::new()
            .name("button-command".to_string())
            .spawn(move || match execute_command(&command) {
                Ok(output) => info!("Command executed successfully: {}", output),
                Err(e) => error!("Failed to execute command '{}': {}", command, e),
            });
        if let Err(e) = spawned {
            error!("Failed to start command thread: {}", e);
        }
    }
}
