//! Orbit camera controller with inertial damping.
//!
//! The controller keeps the camera on a sphere around [`OrbitController::target`].
//! Pointer input accumulates rotation, dolly and pan deltas; [`OrbitController::update`]
//! applies them to the camera. With damping enabled only a fraction of the
//! pending delta is applied per update and the rest decays, so `update` has to
//! run every frame for the easing to play out.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use ur10cam_core::options::OrbitOptions;

use crate::camera::Camera;

const EPS: f32 = 0.000_001;

/// Pointer buttons the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Orbit.
    Primary,
    /// Pan.
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DragState {
    #[default]
    None,
    Rotate,
    Pan,
}

/// Spherical coordinates around the up axis. `phi` is the polar angle from
/// +Y, `theta` the azimuth around Y measured from +Z.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            theta: offset.x.atan2(offset.z),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }

    fn make_safe(&mut self) {
        self.phi = self.phi.clamp(EPS, PI - EPS);
    }
}

/// Interactive orbit/zoom/pan controller for a [`Camera`].
#[derive(Debug, Clone)]
pub struct OrbitController {
    /// Point the camera orbits around.
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub screen_space_panning: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,

    spherical_delta: Spherical,
    scale: f32,
    pan_offset: Vec3,
    zoom_changed: bool,
    state: DragState,
    last_pointer: Option<Vec2>,
    viewport: Vec2,
    last_position: Vec3,
    last_target: Vec3,
}

impl OrbitController {
    /// Creates a controller orbiting the origin.
    #[must_use]
    pub fn new(options: &OrbitOptions) -> Self {
        Self {
            target: Vec3::ZERO,
            enable_damping: options.enable_damping,
            damping_factor: options.damping_factor.clamp(0.0, 1.0),
            screen_space_panning: options.screen_space_panning,
            min_distance: options.min_distance,
            max_distance: options.max_distance.max(options.min_distance),
            min_polar_angle: options.min_polar_angle,
            max_polar_angle: options.max_polar_angle.max(options.min_polar_angle),
            rotate_speed: options.rotate_speed,
            zoom_speed: options.zoom_speed,
            pan_speed: options.pan_speed,
            spherical_delta: Spherical::default(),
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            zoom_changed: false,
            state: DragState::None,
            last_pointer: None,
            viewport: Vec2::new(1.0, 1.0),
            last_position: Vec3::ZERO,
            last_target: Vec3::ZERO,
        }
    }

    /// Sets the size of the element receiving pointer input.
    #[allow(clippy::cast_precision_loss)]
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width.max(1) as f32, height.max(1) as f32);
    }

    /// True while a button drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.state != DragState::None
    }

    /// Starts a drag.
    pub fn pointer_down(&mut self, button: PointerButton, position: Vec2) {
        self.state = match button {
            PointerButton::Primary => DragState::Rotate,
            PointerButton::Secondary => DragState::Pan,
        };
        self.last_pointer = Some(position);
    }

    /// Feeds a pointer position. Only has an effect during a drag.
    pub fn pointer_move(&mut self, position: Vec2, camera: &Camera) {
        let Some(last) = self.last_pointer else {
            return;
        };
        if self.state == DragState::None {
            return;
        }
        let delta = position - last;
        self.last_pointer = Some(position);

        match self.state {
            DragState::Rotate => {
                let scale = 2.0 * PI / self.viewport.y * self.rotate_speed;
                self.rotate_left(delta.x * scale);
                self.rotate_up(delta.y * scale);
            }
            DragState::Pan => self.pan(delta * self.pan_speed, camera),
            DragState::None => {}
        }
    }

    /// Ends a drag.
    pub fn pointer_up(&mut self) {
        self.state = DragState::None;
        self.last_pointer = None;
    }

    /// Wheel input. Positive values zoom in.
    pub fn wheel(&mut self, amount: f32) {
        let zoom_scale = 0.95_f32.powf(self.zoom_speed);
        if amount > 0.0 {
            self.dolly_in(zoom_scale);
        } else if amount < 0.0 {
            self.dolly_out(zoom_scale);
        }
    }

    /// Rotates around the up axis by `angle` radians.
    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    /// Rotates towards the pole by `angle` radians.
    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    /// Moves towards the target. `dolly_scale` is in (0, 1].
    pub fn dolly_in(&mut self, dolly_scale: f32) {
        self.scale *= dolly_scale;
        self.zoom_changed = true;
    }

    /// Moves away from the target. `dolly_scale` is in (0, 1].
    pub fn dolly_out(&mut self, dolly_scale: f32) {
        self.scale /= dolly_scale;
        self.zoom_changed = true;
    }

    /// Pans by a pointer delta in pixels.
    pub fn pan(&mut self, delta: Vec2, camera: &Camera) {
        let target_distance = camera.distance() * (camera.fov / 2.0).tan();
        let left = 2.0 * delta.x * target_distance / self.viewport.y;
        let up = 2.0 * delta.y * target_distance / self.viewport.y;

        let right = camera.right();
        self.pan_offset -= right * left;

        let up_dir = if self.screen_space_panning {
            right.cross(camera.forward())
        } else {
            // Move along the ground plane instead of the screen.
            camera.up.cross(right)
        };
        self.pan_offset += up_dir * up;
    }

    /// Polar angle of the camera around the target, from +Y.
    #[must_use]
    pub fn polar_angle(&self, camera: &Camera) -> f32 {
        Spherical::from_offset(camera.position - self.target).phi
    }

    /// Applies pending motion to the camera. Returns `true` if it moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let mut spherical = Spherical::from_offset(camera.position - self.target);

        if self.enable_damping {
            spherical.theta += self.spherical_delta.theta * self.damping_factor;
            spherical.phi += self.spherical_delta.phi * self.damping_factor;
        } else {
            spherical.theta += self.spherical_delta.theta;
            spherical.phi += self.spherical_delta.phi;
        }

        spherical.phi = spherical.phi.clamp(self.min_polar_angle, self.max_polar_angle);
        spherical.make_safe();

        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        if self.enable_damping {
            self.target += self.pan_offset * self.damping_factor;
        } else {
            self.target += self.pan_offset;
        }

        camera.target = self.target;
        camera.position = self.target + spherical.to_offset();

        if self.enable_damping {
            let decay = 1.0 - self.damping_factor;
            self.spherical_delta.theta *= decay;
            self.spherical_delta.phi *= decay;
            self.pan_offset *= decay;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        let moved = self.zoom_changed
            || self.last_position.distance_squared(camera.position) > EPS
            || self.last_target.distance_squared(self.target) > EPS;
        if moved {
            self.last_position = camera.position;
            self.last_target = self.target;
            self.zoom_changed = false;
        }
        moved
    }
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new(&OrbitOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn setup() -> (OrbitController, Camera) {
        let mut controller = OrbitController::default();
        controller.set_viewport(800, 600);
        let mut camera = Camera::new(800.0 / 600.0);
        controller.update(&mut camera);
        (controller, camera)
    }

    fn drag(controller: &mut OrbitController, camera: &Camera, from: Vec2, to: Vec2) {
        controller.pointer_down(PointerButton::Primary, from);
        controller.pointer_move(to, camera);
        controller.pointer_up();
    }

    #[test]
    fn test_spherical_round_trip() {
        let offset = Vec3::new(1.0, 2.0, 3.0);
        let back = Spherical::from_offset(offset).to_offset();
        assert!((offset - back).length() < 1e-5);
    }

    #[test]
    fn test_initial_update_keeps_camera() {
        let (_, camera) = setup();
        assert!((camera.position - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-4);
    }

    #[test]
    fn test_drag_moves_camera_and_damping_decays() {
        let (mut controller, mut camera) = setup();
        drag(&mut controller, &camera, Vec2::new(400.0, 300.0), Vec2::new(500.0, 300.0));

        // Input has ended; motion continues for several frames.
        let mut previous = camera.position;
        for frame in 0..5 {
            assert!(controller.update(&mut camera), "frame {frame} should still move");
            assert!(previous.distance(camera.position) > 1e-4);
            previous = camera.position;
        }

        let mut settled = false;
        for _ in 0..200 {
            if !controller.update(&mut camera) {
                settled = true;
                break;
            }
        }
        assert!(settled, "damped motion should settle");
        assert!((camera.distance() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_without_damping_motion_stops_immediately() {
        let mut controller = OrbitController::new(&OrbitOptions {
            enable_damping: false,
            ..Default::default()
        });
        controller.set_viewport(800, 600);
        let mut camera = Camera::new(1.0);
        controller.update(&mut camera);

        controller.rotate_left(0.3);
        assert!(controller.update(&mut camera));
        assert!(!controller.update(&mut camera));
    }

    #[test]
    fn test_polar_angle_capped_at_horizon() {
        let (mut controller, mut camera) = setup();
        controller.rotate_up(-3.0);
        for _ in 0..100 {
            controller.update(&mut camera);
            assert!(controller.polar_angle(&camera) <= std::f32::consts::FRAC_PI_2 + 1e-4);
            assert!(camera.position.y >= -1e-3);
        }
    }

    #[test]
    fn test_dolly_respects_bounds() {
        let (mut controller, mut camera) = setup();
        for _ in 0..500 {
            controller.wheel(1.0);
            controller.update(&mut camera);
        }
        assert!((camera.distance() - 1.0).abs() < 1e-4);

        for _ in 0..500 {
            controller.wheel(-1.0);
            controller.update(&mut camera);
        }
        assert!((camera.distance() - 1000.0).abs() < 1e-1);
    }

    #[test]
    fn test_ground_plane_pan_keeps_height() {
        let (mut controller, mut camera) = setup();
        controller.pointer_down(PointerButton::Secondary, Vec2::new(0.0, 0.0));
        controller.pointer_move(Vec2::new(0.0, 50.0), &camera);
        controller.pointer_up();
        for _ in 0..100 {
            controller.update(&mut camera);
        }
        assert!(controller.target.y.abs() < 1e-5);
        assert!(controller.target.z.abs() > 1e-3);
    }

    #[test]
    fn test_move_without_press_is_ignored() {
        let (mut controller, mut camera) = setup();
        controller.pointer_move(Vec2::new(10.0, 10.0), &camera);
        assert!(!controller.is_dragging());
        assert!(!controller.update(&mut camera));
    }

    proptest! {
        #[test]
        fn prop_distance_stays_in_bounds(steps in proptest::collection::vec(-3.0f32..3.0, 1..300)) {
            let (mut controller, mut camera) = setup();
            for amount in steps {
                controller.wheel(amount);
                controller.rotate_left(amount * 0.1);
                controller.update(&mut camera);
                let d = camera.distance();
                prop_assert!(d >= 1.0 - 1e-3 && d <= 1000.0 + 1e-1);
            }
        }
    }
}
