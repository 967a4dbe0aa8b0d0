mod camera;
mod game;
mod input;
mod network;
mod player;
mod rendering;

use camera::Camera;
use clap::Parser;
use game::WorldView;
use input::InputManager;
use log::{error, info, warn};
use macroquad::prelude::*;
use network::{Connection, ConnectionStatus};
use player::{PlayerContext, PlayerController};
use rendering::{HudConfig, Renderer};
use shared::tick::Actor;
use shared::{EntityId, Packet, Role, Vec2};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Role to play: tank, healer or dps
    #[arg(short = 'r', long, default_value = "dps", value_parser = parse_role)]
    role: Role,
}

fn parse_role(value: &str) -> Result<Role, String> {
    match value.to_ascii_lowercase().as_str() {
        "tank" => Ok(Role::Tank),
        "healer" => Ok(Role::Healer),
        "dps" => Ok(Role::Dps),
        other => Err(format!(
            "unknown role '{}', expected tank, healer or dps",
            other
        )),
    }
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Arena Skirmish".to_string(),
        window_width: 960,
        window_height: 720,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {} as {:?}", args.server, args.role);
    info!("Controls: WASD to move, Space to attack, H to heal, R to reconnect, Esc to quit");

    let mut connection = match Connection::new(&args.server, args.role) {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to start networking: {}", e);
            return;
        }
    };

    let mut view = WorldView::new();
    let mut input_manager = InputManager::new();
    let mut renderer = Renderer::new();
    let mut camera = Camera::new(Vec2::ZERO);
    let mut bound_entity: Option<EntityId> = None;
    let mut local: Option<(PlayerController, PlayerContext)> = None;

    loop {
        let dt = get_frame_time();

        for packet in connection.poll() {
            match packet {
                Packet::Snapshot {
                    tick,
                    entities,
                    events,
                    ..
                } => {
                    view.apply_snapshot(tick, entities, events);
                }
                Packet::Connected { entity_id, .. } => {
                    bound_entity = Some(entity_id);
                    local = None;
                }
                Packet::Respawn { entity_id } => {
                    info!("Respawned as entity {}", entity_id);
                    bound_entity = Some(entity_id);
                    local = None;
                }
                Packet::Disconnected { .. } => {
                    bound_entity = None;
                    local = None;
                }
                _ => warn!("Unexpected packet type"),
            }
        }

        // The controller exists exactly while the owned entity is visible.
        // Construct it the first time the bound entity shows up, starting
        // from the stats and position the server says it has.
        if local.is_none() {
            if let Some(entity) = bound_entity {
                if let Some(seen) = view.get(entity) {
                    let mut ctx = PlayerContext::spawn(entity, seen.role(), seen.pos);
                    ctx.time = get_time();
                    let mut controller = PlayerController::new();
                    controller.on_init(&mut ctx);
                    camera.snap_to(seen.pos);
                    local = Some((controller, ctx));
                }
            }
        }
        // Death or server-side removal; a Respawn packet rebinds us.
        if matches!(&local, Some((_, ctx)) if !view.contains(ctx.entity)) {
            local = None;
        }

        let (actions, input_to_send) = input_manager.update();

        if actions.reconnect && connection.status() != ConnectionStatus::Connected {
            connection.reconnect();
            view = WorldView::new();
            bound_entity = None;
            local = None;
        }
        if let Some(input) = input_to_send {
            connection.send_input(&input);
        }

        if let Some((controller, ctx)) = &mut local {
            ctx.move_input = input_manager.current_input().move_vector();
            ctx.time = get_time();
            if let Some(entity) = view.get(ctx.entity) {
                ctx.server_pos = entity.pos;
            }

            if actions.attack {
                let target = view.nearest_opposing(ctx.entity, ctx.stats.attack_range);
                if let Some(target_id) = controller.try_attack(ctx, target) {
                    connection.send_attack(target_id);
                }
            }
            if actions.heal && controller.try_heal(ctx) {
                connection.send_heal();
            }

            controller.on_tick(ctx, dt);
            player::reconcile(ctx, dt);
            camera.follow(ctx.pos, dt);
        }

        renderer.ingest_events(&view.drain_events());
        renderer.update(dt);

        let hud = HudConfig {
            status: connection.status(),
            ping_ms: connection.ping_ms(),
            entity_count: view.len(),
            role: local.as_ref().map(|(_, ctx)| ctx.stats.role),
            state: local.as_ref().and_then(|(controller, _)| controller.state()),
            health: local.as_ref().and_then(|(_, ctx)| {
                view.get(ctx.entity)
                    .map(|e| (e.health.current(), e.health.max()))
            }),
            cooldown_progress: local
                .as_ref()
                .map(|(_, ctx)| ctx.cooldown_progress())
                .unwrap_or(1.0),
        };
        renderer.draw(&view, &camera, local.as_ref().map(|(_, ctx)| ctx), &hud);

        if is_key_pressed(KeyCode::Escape) {
            connection.send_disconnect();
            break;
        }

        next_frame().await;
    }
}
