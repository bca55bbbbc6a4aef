//! Windowed event loop for the customization view.
//!
//! [`run`] opens a window, activates a [`SceneManager`] over the wgpu renderer
//! and feeds it winit input. Slow work is pushed off the event loop: the
//! garment is fetched and parsed on the async runtime, uploads are decoded on
//! the blocking pool. Results come back as [`StudioEvent`]s through the event
//! loop proxy and are applied on the loop thread.
//!
//! Key bindings are documented on [`PanelState`].

use std::{fmt::Debug, path::PathBuf, sync::Arc};

use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition},
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    compositor::{DecodedImage, UploadedImage},
    config::StudioConfig,
    context::Context,
    error::{Result, StudioError},
    order::{Navigator, Route, submit_design},
    panel::{PanelAction, PanelState},
    render::GpuRenderer,
    resources::{GarmentAsset, load_garment_asset},
    scene::{HandOff, LoadTicket, SceneManager, UploadTicket},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

type StudioScene = SceneManager<GpuRenderer>;

pub(crate) enum StudioEvent {
    #[cfg(target_arch = "wasm32")]
    Initialized(Result<StudioScene>),
    ModelLoaded(LoadTicket, anyhow::Result<GarmentAsset>),
    ImageDecoded(UploadTicket, Result<DecodedImage>),
}

impl Debug for StudioEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::ModelLoaded(_, result) => f.debug_tuple("ModelLoaded").field(&result.is_ok()).finish(),
            Self::ImageDecoded(ticket, result) => f
                .debug_tuple("ImageDecoded")
                .field(&ticket.side)
                .field(&result.is_ok())
                .finish(),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<StudioEvent>,
    config: StudioConfig,
    window: Option<Arc<Window>>,
    scene: Option<StudioScene>,
    panel: PanelState,
    cursor: PhysicalPosition<f64>,
    navigator: Box<dyn Navigator>,
    on_hand_off: Box<dyn FnMut(HandOff)>,
}

impl App {
    fn new(
        event_loop: &EventLoop<StudioEvent>,
        #[cfg(not(target_arch = "wasm32"))] async_runtime: tokio::runtime::Runtime,
        config: StudioConfig,
        upload_path: Option<PathBuf>,
        navigator: Box<dyn Navigator>,
        on_hand_off: Box<dyn FnMut(HandOff)>,
    ) -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy: event_loop.create_proxy(),
            config,
            window: None,
            scene: None,
            panel: PanelState::new(upload_path),
            cursor: PhysicalPosition::new(0.0, 0.0),
            navigator,
            on_hand_off,
        }
    }

    fn start_model_load(&mut self) {
        let Some(ticket) = self.scene.as_mut().and_then(|scene| scene.begin_model_load()) else {
            return;
        };
        let proxy = self.proxy.clone();
        let fut = async move {
            let result = load_garment_asset(&ticket.config).await;
            if proxy.send_event(StudioEvent::ModelLoaded(ticket, result)).is_err() {
                log::debug!("event loop closed before the garment finished loading");
            }
        };
        #[cfg(not(target_arch = "wasm32"))]
        self.async_runtime.spawn(fut);
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(fut);
    }

    fn start_image_decode(&self, ticket: UploadTicket) {
        let proxy = self.proxy.clone();
        let decode = move || {
            let result = ticket.decode();
            if proxy.send_event(StudioEvent::ImageDecoded(ticket, result)).is_err() {
                log::debug!("event loop closed before the image was decoded");
            }
        };
        #[cfg(not(target_arch = "wasm32"))]
        self.async_runtime.spawn_blocking(decode);
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(async move { decode() });
    }

    fn activate(&mut self, mut scene: StudioScene) {
        if let Some(window) = &self.window {
            scene.set_scale_factor(window.scale_factor());
        }
        self.scene = Some(scene);
        self.start_model_load();
        self.refresh_title();
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn perform(&mut self, action: PanelAction, event_loop: &ActiveEventLoop) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        let outcome = match action {
            PanelAction::ApplyText(request) => scene.apply_text(&request),
            PanelAction::UploadImage { side, path } => {
                let upload = path.map(UploadedImage::from_path).transpose();
                match upload.and_then(|upload| scene.begin_image_upload(side, upload)) {
                    Ok(ticket) => {
                        self.start_image_decode(ticket);
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            PanelAction::SetColour(hex) => scene.set_garment_colour(hex),
            PanelAction::CaptureAndHandOff => {
                submit_design(scene, self.navigator.as_mut()).map(|hand_off| (self.on_hand_off)(hand_off))
            }
            PanelAction::BuyCustom => {
                self.navigator.navigate(Route::BuyCustom);
                Ok(())
            }
            PanelAction::Quit => {
                scene.dispose();
                event_loop.exit();
                Ok(())
            }
        };
        if let Err(e) = outcome {
            self.report(&e);
        }
    }

    /// User-facing errors go to the title bar; the rest only to the log.
    fn report(&self, error: &StudioError) {
        if error.is_user_facing() {
            log::warn!("{error}");
            if let Some(window) = &self.window {
                window.set_title(&format!("tee-studio: {error}"));
            }
        } else {
            log::error!("{error}");
        }
    }

    fn refresh_title(&self) {
        if let Some(window) = &self.window {
            window.set_title(&format!(
                "tee-studio | {} side | {} | \"{}\"",
                self.panel.side, self.panel.font, self.panel.text
            ));
        }
    }
}

impl ApplicationHandler<StudioEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes()
            .with_title("tee-studio")
            .with_inner_size(LogicalSize::new(1280.0, 800.0));

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("could not create a window: {e}");
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());
        let size = window.inner_size();
        let config = self.config.clone();

        #[cfg(not(target_arch = "wasm32"))]
        {
            let ctx = self
                .async_runtime
                .block_on(Context::new(window, config.clear_colour()));
            let scene = SceneManager::initialize(config, (size.width, size.height), |config, viewport| {
                ctx.map(|ctx| GpuRenderer::new(ctx, config, viewport))
            });
            match scene {
                Ok(scene) => self.activate(scene),
                Err(e) => {
                    log::error!("{e}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let ctx = Context::new(window, config.clear_colour()).await;
                let scene = SceneManager::initialize(config, (size.width, size.height), |config, viewport| {
                    ctx.map(|ctx| GpuRenderer::new(ctx, config, viewport))
                });
                assert!(proxy.send_event(StudioEvent::Initialized(scene)).is_ok());
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: StudioEvent) {
        match event {
            #[cfg(target_arch = "wasm32")]
            StudioEvent::Initialized(result) => match result {
                Ok(scene) => {
                    let size = scene.renderer().ctx.window.as_ref().map(|w| w.inner_size());
                    self.activate(scene);
                    if let (Some(scene), Some(size)) = (self.scene.as_mut(), size) {
                        scene.resize(size.width, size.height);
                    }
                }
                Err(e) => {
                    log::error!("{e}");
                    event_loop.exit();
                }
            },
            StudioEvent::ModelLoaded(ticket, result) => match self.scene.as_mut() {
                Some(scene) => scene.finish_model_load(ticket, result),
                None => log::debug!("garment arrived without an active view"),
            },
            StudioEvent::ImageDecoded(ticket, result) => {
                let outcome = match self.scene.as_mut() {
                    Some(scene) => scene.finish_image_upload(ticket, result),
                    None => Ok(()),
                };
                if let Err(e) = outcome {
                    self.report(&e);
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(scene) = self.scene.as_mut() else {
            if let WindowEvent::CloseRequested = event {
                event_loop.exit();
            }
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                scene.dispose();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => scene.resize(size.width, size.height),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => scene.set_scale_factor(scale_factor),
            WindowEvent::RedrawRequested => {
                scene.frame();
                // Keep drawing so orbit damping can settle.
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = position;
                scene.pointer_moved(position.x, position.y);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => scene.pointer_pressed(self.cursor.x, self.cursor.y),
                ElementState::Released => scene.pointer_released(),
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / 50.0) as f32,
                };
                scene.scroll(lines);
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                let action = self
                    .panel
                    .handle_key(&event.logical_key, event.text.as_deref());
                match action {
                    Some(action) => self.perform(action, event_loop),
                    None => self.refresh_title(),
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut scene) = self.scene.take() {
            scene.dispose();
        }
    }
}

/// Opens the customization window and blocks until it is closed.
///
/// `upload_path` is the file the upload key reads. `navigator` is told which
/// storefront screen comes next; `on_hand_off` receives the design and both
/// captures whenever the user finishes a design.
pub fn run(
    config: StudioConfig,
    upload_path: Option<PathBuf>,
    navigator: impl Navigator + 'static,
    on_hand_off: impl FnMut(HandOff) + 'static,
) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<StudioEvent> = EventLoop::with_user_event().build()?;
    #[cfg(not(target_arch = "wasm32"))]
    let async_runtime = tokio::runtime::Runtime::new()?;

    let mut app = App::new(
        &event_loop,
        #[cfg(not(target_arch = "wasm32"))]
        async_runtime,
        config,
        upload_path,
        Box::new(navigator),
        Box::new(on_hand_off),
    );

    event_loop.run_app(&mut app)?;

    Ok(())
}
