/// Per-entity lifecycle hooks, driven explicitly by the owning side's
/// loop. `on_init` runs exactly once, after construction and before any
/// tick. `on_tick` runs once per loop iteration with the elapsed frame
/// time; `on_fixed_tick` runs on the fixed-rate phase for physics-adjacent
/// work.
///
/// There is no global scheduler behind this: whoever owns the actor calls
/// the hooks. The server drives enemy minds, each client drives its own
/// player controller.
pub trait Actor {
    type Ctx;

    fn on_init(&mut self, _ctx: &mut Self::Ctx) {}

    fn on_tick(&mut self, _ctx: &mut Self::Ctx, _dt: f32) {}

    fn on_fixed_tick(&mut self, _ctx: &mut Self::Ctx, _dt: f32) {}
}
