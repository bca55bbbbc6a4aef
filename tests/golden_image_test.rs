//! Renders through the wgpu renderer on a headless device and checks the
//! pixels that come back. Needs a GPU adapter, hence the feature gate.

#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
mod gpu {
    use image::Rgba;
    use tee_studio::{
        Font, Placement, Side, StudioConfig, TextRequest,
        context::Context,
        render::GpuRenderer,
        scene::{Renderer, SceneManager, Viewport},
    };

    use crate::common::test_utils::{TEST_FONT, garment_asset, png_upload};

    const SIZE: u32 = 64;

    fn config() -> StudioConfig {
        StudioConfig {
            side_panel_width: 0,
            canvas_size: 64,
            font_size: 12.0,
            font_files: vec![TEST_FONT.into()],
            ..Default::default()
        }
    }

    fn headless_renderer(config: &StudioConfig, clear: wgpu::Color, viewport: Viewport) -> GpuRenderer {
        let ctx = futures::executor::block_on(Context::headless(SIZE, SIZE, clear))
            .expect("Failed to create a headless GPU context.");
        GpuRenderer::new(ctx, config, viewport)
    }

    fn gpu_scene(clear: wgpu::Color) -> SceneManager<GpuRenderer> {
        let mut scene = SceneManager::initialize(config(), (SIZE, SIZE), |config, viewport| {
            Ok(headless_renderer(config, clear, viewport))
        })
        .expect("Failed to initialize the scene.");
        let ticket = scene.begin_model_load().unwrap();
        scene.finish_model_load(ticket, Ok(garment_asset(&["Front", "Back"])));
        assert!(scene.has_garment());
        scene
    }

    #[test]
    fn should_render_clear_colour() {
        let config = config();
        let viewport = Viewport::for_window(SIZE, SIZE, 0);
        let mut renderer = headless_renderer(&config, wgpu::Color::WHITE, viewport);
        let camera = tee_studio::camera::Camera::new(config.camera_position, config.orbit_target);
        let projection = tee_studio::camera::Projection::from_config(&config, SIZE, SIZE);

        renderer.render(&camera, &projection, None).unwrap();
        let frame = renderer.read_offscreen().unwrap();
        assert_eq!(frame.dimensions(), (SIZE, SIZE));
        for pixel in frame.pixels() {
            assert_eq!(pixel, &Rgba([255, 255, 255, 255]));
        }
    }

    #[test]
    fn should_draw_the_garment_in_the_front_capture() {
        let mut scene = gpu_scene(wgpu::Color::BLACK);
        let views = scene.capture_both_views().unwrap();
        assert_eq!((views.front.width, views.front.height), (SIZE, SIZE));
        assert_eq!((views.back.width, views.back.height), (SIZE, SIZE));

        let front = image::load_from_memory(&views.front.png).unwrap().to_rgba8();
        let centre = front.get_pixel(SIZE / 2, SIZE / 2);
        assert_ne!(centre, &Rgba([0, 0, 0, 255]));
        let corner = front.get_pixel(0, 0);
        assert_eq!(corner, &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn should_survive_rebinding_textures_between_frames() {
        let mut scene = gpu_scene(wgpu::Color::BLACK);
        scene.frame();
        scene
            .apply_text(&TextRequest::new("HELLO", Side::Front, Font::Arial, Placement::Middle))
            .unwrap();
        scene.frame();
        scene
            .apply_image(Side::Front, Some(png_upload("red.png", Rgba([255, 0, 0, 255]))))
            .unwrap();
        scene.set_garment_colour("#ffff00").unwrap();
        scene.frame();

        let views = scene.capture_both_views().unwrap();
        let front = image::load_from_memory(&views.front.png).unwrap().to_rgba8();
        let centre = front.get_pixel(SIZE / 2, SIZE / 2);
        // Red image under a yellow tint: red survives, blue does not.
        assert!(centre.0[0] > centre.0[2]);
        scene.dispose();
    }
}
