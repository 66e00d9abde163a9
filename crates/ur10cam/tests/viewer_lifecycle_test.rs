//! Viewer lifecycle tests against a recording renderer.
//!
//! None of these need a GPU: the viewer only talks to its renderer through
//! `SceneRenderer`.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use image::RgbaImage;
use proptest::prelude::*;
use ur10cam::*;

/// Shared view of what the mock renderer has seen.
#[derive(Clone, Default)]
struct RendererStats {
    attached: Arc<AtomicBool>,
    frames: Arc<AtomicUsize>,
    resizes: Arc<AtomicUsize>,
    captures: Arc<AtomicUsize>,
}

struct MockRenderer {
    size: (u32, u32),
    stats: RendererStats,
}

impl MockRenderer {
    fn new(width: u32, height: u32, stats: &RendererStats) -> Self {
        stats.attached.store(true, Ordering::SeqCst);
        Self {
            size: (width, height),
            stats: stats.clone(),
        }
    }
}

impl SceneRenderer for MockRenderer {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.size = (width, height);
            self.stats.resizes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn render(&mut self, _scene: &Scene, _camera: &Camera) -> RenderResult<()> {
        self.stats.frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn capture_frame(&mut self, _scene: &Scene, _camera: &Camera) -> RenderResult<Vec<u8>> {
        self.stats.captures.fetch_add(1, Ordering::SeqCst);
        let (width, height) = self.size;
        Ok([40, 80, 120, 255].repeat((width * height) as usize))
    }
}

impl Drop for MockRenderer {
    fn drop(&mut self) {
        self.stats.attached.store(false, Ordering::SeqCst);
    }
}

/// Refuses every request, like a user denying camera permission.
struct DenyingCapture;

impl CaptureDevice for DenyingCapture {
    fn is_available(&self) -> bool {
        true
    }

    fn request_video(&self) -> std::result::Result<MediaStream, CaptureError> {
        Err(CaptureError::PermissionDenied)
    }
}

struct FlagTrack {
    label: String,
    stopped: Arc<AtomicBool>,
}

impl VideoTrack for FlagTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn state(&self) -> TrackState {
        if self.stopped.load(Ordering::SeqCst) {
            TrackState::Stopped
        } else {
            TrackState::Live
        }
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Grants a stream of `tracks` flag tracks with one frame already published.
struct GrantingCapture {
    tracks: Vec<Arc<AtomicBool>>,
}

impl GrantingCapture {
    fn new(tracks: usize) -> Self {
        Self {
            tracks: (0..tracks).map(|_| Arc::new(AtomicBool::new(false))).collect(),
        }
    }

    fn all_stopped(&self) -> bool {
        self.tracks.iter().all(|t| t.load(Ordering::SeqCst))
    }
}

impl CaptureDevice for GrantingCapture {
    fn is_available(&self) -> bool {
        true
    }

    fn request_video(&self) -> std::result::Result<MediaStream, CaptureError> {
        let frames = Arc::new(FrameSlot::new());
        frames.publish(RgbaImage::from_pixel(4, 4, image::Rgba([0, 128, 255, 255])));
        let tracks = self
            .tracks
            .iter()
            .enumerate()
            .map(|(i, stopped)| {
                Box::new(FlagTrack {
                    label: format!("track {i}"),
                    stopped: stopped.clone(),
                }) as Box<dyn VideoTrack>
            })
            .collect();
        Ok(MediaStream::new(tracks, frames))
    }
}

/// Grants one flag track, but only after the test opens the gate, like a
/// permission prompt the user has not answered yet.
struct GatedCapture {
    gate: Mutex<mpsc::Receiver<()>>,
    stopped: Arc<AtomicBool>,
}

impl GatedCapture {
    fn new() -> (Arc<Self>, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let device = Arc::new(Self {
            gate: Mutex::new(rx),
            stopped: Arc::new(AtomicBool::new(false)),
        });
        (device, tx)
    }
}

impl CaptureDevice for GatedCapture {
    fn is_available(&self) -> bool {
        true
    }

    fn request_video(&self) -> std::result::Result<MediaStream, CaptureError> {
        self.gate
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| CaptureError::PermissionDenied)?;
        let frames = Arc::new(FrameSlot::new());
        frames.publish(RgbaImage::new(2, 2));
        let track = FlagTrack {
            label: "gated".into(),
            stopped: self.stopped.clone(),
        };
        Ok(MediaStream::new(vec![Box::new(track)], frames))
    }
}

fn start_viewer(
    options: ViewerOptions,
    capture: Arc<dyn CaptureDevice>,
    stats: &RendererStats,
) -> Viewer<MockRenderer> {
    let mut viewer = Viewer::new(options);
    viewer
        .start(|| Ok(MockRenderer::new(800, 600, stats)), capture)
        .unwrap();
    viewer
}

/// Runs frames until the model fetch settles.
fn pump_until_loaded(viewer: &mut Viewer<MockRenderer>) {
    for _ in 0..400 {
        viewer.frame();
        if !viewer.model_pending() {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("model fetch did not settle");
}

/// Runs frames until the camera request is answered.
fn pump_until_capture_settled(viewer: &mut Viewer<MockRenderer>) {
    for _ in 0..400 {
        viewer.frame();
        if !viewer.capture_pending() {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("camera request did not settle");
}

fn wait_for(flag: &AtomicBool) -> bool {
    for _ in 0..400 {
        if flag.load(Ordering::SeqCst) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_start_builds_scene_camera_and_light() {
    let stats = RendererStats::default();
    let mut viewer = start_viewer(
        common::options_without_model("start"),
        Arc::new(NoCapture),
        &stats,
    );

    assert!(viewer.is_running());
    assert!(stats.attached.load(Ordering::SeqCst));
    assert_eq!(viewer.scene().node_count(), 1);
    assert!(viewer.scene().find(AMBIENT_LIGHT_NAME).is_some());
    assert_eq!(viewer.scene().ambient_radiance(), Vec3::ONE);

    let camera = viewer.camera();
    assert!((camera.fov_degrees() - 75.0).abs() < 1e-4);
    assert!((camera.aspect_ratio - 800.0 / 600.0).abs() < 1e-6);
    assert_eq!(camera.near, 0.1);
    assert_eq!(camera.far, 1000.0);
    assert_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0));

    assert!(viewer.frame());
    assert_eq!(stats.frames.load(Ordering::SeqCst), 1);
    viewer.stop();
}

#[test]
fn test_start_twice_is_rejected() {
    let stats = RendererStats::default();
    let mut viewer = start_viewer(
        common::options_without_model("twice"),
        Arc::new(NoCapture),
        &stats,
    );
    let second = viewer.start(|| Ok(MockRenderer::new(1, 1, &stats)), Arc::new(NoCapture));
    assert!(matches!(second, Err(ViewerError::AlreadyStarted)));
}

#[test]
fn test_renderer_failure_is_returned() {
    let mut viewer: Viewer<MockRenderer> =
        Viewer::new(common::options_without_model("renderer_failure"));
    let result = viewer.start(|| Err(RenderError::AdapterCreationFailed), Arc::new(NoCapture));
    assert!(matches!(result, Err(ViewerError::RenderError(_))));
    assert!(!viewer.is_running());
    assert!(!viewer.frame());
}

#[test]
fn test_model_load_attaches_with_fixed_transform() {
    let dir = common::temp_dir("model_ok");
    std::fs::write(dir.join("arm.glb"), common::red_quad_glb()).unwrap();

    let stats = RendererStats::default();
    let mut viewer = start_viewer(common::options_for(&dir, "arm.glb"), Arc::new(NoCapture), &stats);
    assert_eq!(viewer.scene().node_count(), 1);

    pump_until_loaded(&mut viewer);

    assert_eq!(viewer.scene().node_count(), 2);
    let model = &viewer.scene().nodes()[1];
    assert_eq!(model.transform.scale, Vec3::splat(0.1));
    assert_eq!(model.transform.translation, Vec3::new(0.0, -3.0, 0.0));

    let mut meshes = 0;
    viewer.scene().visit_meshes(|mesh, _| {
        meshes += 1;
        assert_eq!(mesh.base_color, Vec4::new(1.0, 0.0, 0.0, 1.0));
    });
    assert_eq!(meshes, 1);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_model_leaves_scene_unchanged() {
    let stats = RendererStats::default();
    let mut viewer = start_viewer(
        common::options_without_model("model_missing"),
        Arc::new(NoCapture),
        &stats,
    );

    pump_until_loaded(&mut viewer);

    assert_eq!(viewer.scene().node_count(), 1);
    assert!(viewer.is_running());
    assert!(viewer.frame());
}

#[test]
fn test_corrupt_model_leaves_scene_unchanged() {
    let dir = common::temp_dir("model_corrupt");
    std::fs::write(dir.join("arm.glb"), b"definitely not gltf").unwrap();

    let stats = RendererStats::default();
    let mut viewer = start_viewer(common::options_for(&dir, "arm.glb"), Arc::new(NoCapture), &stats);
    pump_until_loaded(&mut viewer);

    assert_eq!(viewer.scene().node_count(), 1);
    assert!(viewer.frame());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_stop_before_model_arrives_discards_it() {
    let dir = common::temp_dir("model_cancel");
    std::fs::write(dir.join("arm.glb"), common::red_quad_glb()).unwrap();

    let stats = RendererStats::default();
    let mut viewer = start_viewer(common::options_for(&dir, "arm.glb"), Arc::new(NoCapture), &stats);
    viewer.stop();

    std::thread::sleep(Duration::from_millis(50));
    assert!(!viewer.frame());
    assert!(!viewer.model_pending());
    assert_eq!(viewer.scene().node_count(), 0);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_capture_denied_leaves_background_unset() {
    let stats = RendererStats::default();
    let mut viewer = start_viewer(
        common::options_without_model("denied"),
        Arc::new(DenyingCapture),
        &stats,
    );
    pump_until_capture_settled(&mut viewer);

    assert!(viewer.scene().background.is_none());
    assert!(viewer.video().is_none());
    assert!(viewer.frame());
}

#[test]
fn test_no_capture_device_leaves_background_unset() {
    let stats = RendererStats::default();
    let mut viewer = start_viewer(
        common::options_without_model("no_device"),
        Arc::new(NoCapture),
        &stats,
    );
    pump_until_capture_settled(&mut viewer);
    assert!(viewer.scene().background.is_none());
    assert!(viewer.is_running());
}

#[test]
fn test_capture_granted_binds_video_background() {
    let stats = RendererStats::default();
    let capture = Arc::new(GrantingCapture::new(1));
    let mut viewer = start_viewer(common::options_without_model("granted"), capture, &stats);
    pump_until_capture_settled(&mut viewer);

    let video = viewer.video().expect("video element bound");
    assert!(video.is_playing());

    match &viewer.scene().background {
        Some(Background::Video(texture)) => {
            assert_eq!(texture.min_filter, FilterMode::Linear);
            assert_eq!(texture.mag_filter, FilterMode::Linear);
            let frame = texture.source().current_frame().expect("frame");
            assert_eq!((frame.width(), frame.height()), (4, 4));
        }
        other => panic!("expected video background, got {other:?}"),
    }
}

#[test]
fn test_stop_releases_everything() {
    let stats = RendererStats::default();
    let capture = Arc::new(GrantingCapture::new(2));
    let mut viewer = start_viewer(
        common::options_without_model("teardown"),
        capture.clone(),
        &stats,
    );
    pump_until_capture_settled(&mut viewer);
    assert!(viewer.video().is_some());
    assert!(!capture.all_stopped());

    let frame_loop = viewer.frame_loop();
    assert!(viewer.stop());

    assert!(capture.all_stopped(), "every track must be stopped");
    assert!(!stats.attached.load(Ordering::SeqCst), "surface must be detached");
    assert!(viewer.renderer().is_none());
    assert!(viewer.video().is_none());
    assert_eq!(viewer.scene().node_count(), 0);
    assert!(viewer.scene().background.is_none());
    assert!(!frame_loop.is_running());

    let frames = stats.frames.load(Ordering::SeqCst);
    assert!(!viewer.frame());
    assert_eq!(stats.frames.load(Ordering::SeqCst), frames);

    assert!(!viewer.stop(), "second stop is a no-op");
}

#[test]
fn test_drop_releases_tracks() {
    let stats = RendererStats::default();
    let capture = Arc::new(GrantingCapture::new(1));
    {
        let mut viewer =
            start_viewer(common::options_without_model("drop"), capture.clone(), &stats);
        pump_until_capture_settled(&mut viewer);
        assert!(viewer.video().is_some());
    }
    assert!(capture.all_stopped());
    assert!(!stats.attached.load(Ordering::SeqCst));
}

#[test]
fn test_slow_camera_does_not_block_start_or_frames() {
    let stats = RendererStats::default();
    let (device, gate) = GatedCapture::new();

    let started = Instant::now();
    let mut viewer = start_viewer(
        common::options_without_model("slow_camera"),
        device.clone(),
        &stats,
    );
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(viewer.capture_pending());

    for _ in 0..3 {
        assert!(viewer.frame());
    }
    assert_eq!(stats.frames.load(Ordering::SeqCst), 3);
    assert!(viewer.scene().background.is_none());

    gate.send(()).unwrap();
    pump_until_capture_settled(&mut viewer);
    assert!(matches!(viewer.scene().background, Some(Background::Video(_))));
    assert!(viewer.video().is_some_and(|v| v.is_playing()));

    viewer.stop();
    assert!(device.stopped.load(Ordering::SeqCst));
}

#[test]
fn test_camera_granted_after_stop_is_released() {
    let stats = RendererStats::default();
    let (device, gate) = GatedCapture::new();
    let mut viewer = start_viewer(
        common::options_without_model("late_camera"),
        device.clone(),
        &stats,
    );
    viewer.stop();
    assert!(!viewer.capture_pending());

    gate.send(()).unwrap();
    assert!(wait_for(&device.stopped), "late stream must be stopped");
    assert!(!viewer.frame());
    assert!(viewer.video().is_none());
    assert!(viewer.scene().background.is_none());
}

#[test]
fn test_screenshot_reuses_running_renderer() {
    let dir = common::temp_dir("screenshot");
    let path = dir.join("shot.png");
    let stats = RendererStats::default();
    let mut viewer = start_viewer(
        common::options_without_model("screenshot"),
        Arc::new(NoCapture),
        &stats,
    );

    viewer.save_screenshot(&path).unwrap();
    assert_eq!(stats.captures.load(Ordering::SeqCst), 1);
    let image = image::open(&path).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (800, 600));
    assert_eq!(image.get_pixel(0, 0).0, [40, 80, 120, 255]);

    viewer.stop();
    assert!(matches!(viewer.save_screenshot(&path), Err(ViewerError::NotStarted)));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_resize_after_stop_is_ignored() {
    let stats = RendererStats::default();
    let mut viewer = start_viewer(
        common::options_without_model("resize_stop"),
        Arc::new(NoCapture),
        &stats,
    );
    let aspect = viewer.camera().aspect_ratio;
    viewer.stop();

    viewer.on_resize(300, 900);
    assert_eq!(viewer.camera().aspect_ratio, aspect);
    assert_eq!(stats.resizes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_zero_resize_is_ignored() {
    let stats = RendererStats::default();
    let mut viewer = start_viewer(
        common::options_without_model("resize_zero"),
        Arc::new(NoCapture),
        &stats,
    );
    viewer.on_resize(0, 400);
    viewer.on_resize(400, 0);
    assert_eq!(viewer.renderer().unwrap().size(), (800, 600));
    assert_eq!(stats.resizes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_drag_orbits_camera_with_damping() {
    let stats = RendererStats::default();
    let mut viewer = start_viewer(
        common::options_without_model("drag"),
        Arc::new(NoCapture),
        &stats,
    );
    let start = viewer.camera().position;

    viewer.pointer_down(PointerButton::Primary, Vec2::new(400.0, 300.0));
    viewer.pointer_move(Vec2::new(480.0, 300.0));
    viewer.pointer_up();

    let mut positions = Vec::new();
    for _ in 0..4 {
        viewer.frame();
        positions.push(viewer.camera().position);
    }
    assert!(positions[0].distance(start) > 1e-3);
    for pair in positions.windows(2) {
        assert!(pair[0].distance(pair[1]) > 1e-5, "damping keeps the camera moving");
    }
    assert!((viewer.camera().position.length() - 5.0).abs() < 1e-3);
}

#[test]
fn test_input_after_stop_is_ignored() {
    let stats = RendererStats::default();
    let mut viewer = start_viewer(
        common::options_without_model("input_stop"),
        Arc::new(NoCapture),
        &stats,
    );
    viewer.stop();
    viewer.pointer_down(PointerButton::Primary, Vec2::ZERO);
    assert!(!viewer.controller().is_dragging());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_resize_syncs_surface_and_aspect(
        sizes in proptest::collection::vec((1u32..4096, 1u32..4096), 1..8)
    ) {
        let stats = RendererStats::default();
        let mut viewer = start_viewer(
            common::options_without_model("resize_prop"),
            Arc::new(NoCapture),
            &stats,
        );
        for (w, h) in sizes {
            viewer.on_resize(w, h);
            prop_assert_eq!(viewer.renderer().unwrap().size(), (w, h));
            #[allow(clippy::cast_precision_loss)]
            let expected = w as f32 / h as f32;
            prop_assert!((viewer.camera().aspect_ratio - expected).abs() <= expected * 1e-6);
        }
    }
}
