use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use glam::{Quat, Vec3};
use roomsync::config::{DEFAULT_HOST, DEFAULT_PORT};
use roomsync::{SessionError, Snapshot, SyncClient, SyncConfig};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "roomsync", about = "Headless room sync peer")]
struct Cli {
    #[arg(long, env = "ROOMSYNC_HOST", default_value = DEFAULT_HOST)]
    host: String,

    #[arg(long, env = "ROOMSYNC_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Take local control and move the object along a circle.
    #[arg(long, default_value_t = false)]
    drive: bool,

    #[arg(long, default_value_t = 60)]
    ticks_per_second: u32,

    #[arg(long, default_value_t = 30)]
    duration_secs: u64,

    /// Print a JSON status line once per second.
    #[arg(long, default_value_t = false)]
    status: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the relay for a new room.
    Create,
    /// Join an existing room by code.
    Join { code: String },
}

fn main() -> Result<(), SessionError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = SyncConfig { host: cli.host.clone(), port: cli.port, ..SyncConfig::from_env() };
    let mut live = Snapshot::default();
    let mut client = SyncClient::new(config, live);
    client.on_target_scale_changed(|scale| info!(?scale, "remote scale changed"));

    match &cli.command {
        Command::Create => client.create_room()?,
        Command::Join { code } => client.join_room(code)?,
    }

    run(&cli, &mut client, &mut live);
    client.disconnect();
    Ok(())
}

fn run(cli: &Cli, client: &mut SyncClient, live: &mut Snapshot) {
    let tick = Duration::from_secs_f64(1.0 / f64::from(cli.ticks_per_second.max(1)));
    let start = Instant::now();
    let end = run_deadline(start, cli.duration_secs);
    if end.is_none() {
        warn!(duration_secs = cli.duration_secs, "duration out of range, running until interrupted");
    }
    let mut last_status = start;
    let mut announced_room = false;

    while end.is_none_or(|end| Instant::now() < end) {
        let now = Instant::now();

        if client.in_room() && !announced_room {
            announced_room = true;
            info!(room_code = client.room_id().unwrap_or_default(), "in room");
            if cli.drive {
                client.start_local_control();
            }
        }
        if announced_room && !client.in_room() {
            info!("left room");
            break;
        }

        if cli.drive && client.locally_controlled() {
            *live = circle_pose(now.duration_since(start).as_secs_f32());
        }
        client.tick_at(live, now);

        if cli.status && now.duration_since(last_status) >= Duration::from_secs(1) {
            last_status = now;
            match serde_json::to_string(&client.status()) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "status encode failed"),
            }
        }

        std::thread::sleep(tick);
    }
}

/// When the tick loop should stop; `None` if the duration overflows `Instant`.
fn run_deadline(start: Instant, duration_secs: u64) -> Option<Instant> {
    start.checked_add(Duration::from_secs(duration_secs))
}

/// Pose on a unit circle, turning to face along the path.
fn circle_pose(t: f32) -> Snapshot {
    Snapshot {
        position: Vec3::new(t.cos(), 0.0, t.sin()),
        rotation: Quat::from_rotation_y(-t),
        scale: Vec3::ONE,
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
