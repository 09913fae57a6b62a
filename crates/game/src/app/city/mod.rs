mod camera;
mod config;
mod draw;
mod host;
mod movement;
mod nav;
mod npc;
mod particles;
mod scene_impl;

pub(crate) use config::load_sim_config;
pub(crate) use host::LocalHost;
pub(crate) use scene_impl::CityScene;

/// Per-frame constants are tuned for this rate.
pub(crate) const REFERENCE_FRAMES_PER_SECOND: f32 = 60.0;

/// Number of reference frames covered by `dt_seconds`.
pub(crate) fn frame_scale(dt_seconds: f32) -> f32 {
    if dt_seconds.is_finite() && dt_seconds > 0.0 {
        dt_seconds * REFERENCE_FRAMES_PER_SECOND
    } else {
        0.0
    }
}

/// Blend factor equivalent to applying `per_frame` once per reference frame
/// for `frame_scale` frames.
pub(crate) fn smoothing_alpha(per_frame: f32, frame_scale: f32) -> f32 {
    let per_frame = per_frame.clamp(0.0, 1.0);
    if frame_scale <= 0.0 {
        return 0.0;
    }
    1.0 - (1.0 - per_frame).powf(frame_scale)
}
