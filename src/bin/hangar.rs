//! A hangar of slowly turning airships.
//!
//! Loads `airship.obj` and `airship.png` from the asset root (`FLOW_ASSET_ROOT`,
//! `./assets` by default), plus `cloud.obj` and `cloud.png` for a few
//! translucent clouds drawn above the ships. Without them the fallback cube is
//! drawn untextured.

use flow_instancing::{
    Deg, InstanceId, Model, Vector3, WindowEvent,
    flow::{self, GraphicsFlow, SceneContext},
};
use instant::Duration;

const GRID: usize = 5;
const SPACING: f32 = 3.0;
const SPIN_DEGREES_PER_SECOND: f32 = 30.0;
const TICKS_PER_RESPAWN: u32 = 120;
const CLOUD_ALPHA: f32 = 0.6;

#[derive(Default)]
struct Hangar {
    ships: Option<Model>,
    clouds: Option<Model>,
    ticks: u32,
    paused: bool,
}

fn slot_position(i: usize) -> Vector3<f32> {
    let offset = (GRID as f32 - 1.0) / 2.0;
    Vector3::new(
        (i % GRID) as f32 - offset,
        0.0,
        (i / GRID) as f32 - offset,
    ) * SPACING
}

impl Hangar {
    fn place(ships: &mut Model, position: Vector3<f32>) -> InstanceId {
        let id = ships.create_instance();
        if let Some(mut ship) = ships.instance_mut(id) {
            ship.set_position(position)
                .set_scale(Vector3::new(0.8, 0.8, 0.8))
                .set_rotation(Vector3::unit_y(), Deg(position.x * 10.0));
        }
        id
    }
}

impl GraphicsFlow for Hangar {
    fn on_init(&mut self, scene: &mut SceneContext) -> anyhow::Result<()> {
        let mut ships = Model::load(&scene.ctx, scene.config.asset_path("airship.obj"));
        if ships
            .load_texture(&scene.ctx, scene.config.asset_path("airship.png"))
            .is_err()
        {
            log::info!("Drawing {} with the default texture.", ships.label());
        }
        for i in 0..GRID * GRID {
            Self::place(&mut ships, slot_position(i));
        }
        self.ships = Some(ships);

        let mut clouds = Model::load(&scene.ctx, scene.config.asset_path("cloud.obj"));
        if clouds
            .load_texture(&scene.ctx, scene.config.asset_path("cloud.png"))
            .is_err()
        {
            log::info!("Drawing {} with the default texture.", clouds.label());
        }
        for x in [-6.0, -1.0, 4.0] {
            let id = clouds.create_instance();
            if let Some(mut cloud) = clouds.instance_mut(id) {
                cloud
                    .set_position(Vector3::new(x, 6.0, x * 0.5))
                    .set_scale(Vector3::new(3.0, 1.0, 2.0));
            }
        }
        self.clouds = Some(clouds);
        Ok(())
    }

    fn on_update(&mut self, _scene: &mut SceneContext, dt: Duration) {
        let Some(ships) = self.ships.as_mut() else {
            return;
        };
        if self.paused {
            return;
        }
        let ids: Vec<InstanceId> = ships.instances().map(|(id, _)| id).collect();
        let angle = Deg(SPIN_DEGREES_PER_SECOND * dt.as_secs_f32());
        for id in ids {
            if let Some(mut ship) = ships.instance_mut(id) {
                ship.rotate(Vector3::unit_y(), angle);
            }
        }
    }

    fn on_tick(&mut self, _scene: &mut SceneContext) {
        self.ticks += 1;
        if self.ticks % TICKS_PER_RESPAWN != 0 {
            return;
        }
        let Some(ships) = self.ships.as_mut() else {
            return;
        };
        // the oldest ship leaves and a new one takes its slot at the back of the line
        let oldest = ships
            .instances()
            .next()
            .map(|(id, ship)| (id, ship.position()));
        if let Some((id, position)) = oldest {
            ships.destroy_instance(id);
            Self::place(ships, position);
        }
    }

    fn on_window_events(&mut self, _scene: &mut SceneContext, event: &WindowEvent) {
        if let WindowEvent::KeyboardInput { event: key, .. } = event {
            if key.state.is_pressed() && key.logical_key == winit::keyboard::Key::Character(" ".into()) {
                self.paused = !self.paused;
            }
        }
    }

    fn on_render(&mut self, scene: &mut SceneContext, render_pass: &mut wgpu::RenderPass<'_>) {
        if let Some(ships) = self.ships.as_mut() {
            ships.draw_all(&scene.ctx, render_pass);
        }
        // clouds last so the ships show through them
        if let Some(clouds) = self.clouds.as_mut() {
            scene.program.set_float("alpha", CLOUD_ALPHA);
            scene.program.use_program(&scene.ctx, render_pass);
            clouds.draw_all(&scene.ctx, render_pass);
            scene.program.set_float("alpha", 1.0);
        }
    }
}

fn main() -> anyhow::Result<()> {
    flow::run(Hangar::default())
}
