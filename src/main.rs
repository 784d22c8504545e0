// main.rs: 全景 VR 查看器桌面宿主：窗口、菜单、状态栏与交互

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // 在 Release 模式下隐藏控制台窗口

mod fonts;
mod i18n;
mod input;
mod renderer;

use input::{Gesture, TouchTracker};
use panorama_vr::{
    texture::decode_image_file, ImageTextureLoader, MotionSource, NoMotion, PanoramaView,
    ScreenOrientation, TextureLoadError, ViewerConfig, Viewport,
};
use renderer::Renderer;

use glam::Vec2;
use image::RgbaImage;
use winit::{
    dpi::LogicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

type LoadResult = (PathBuf, Result<RgbaImage, TextureLoadError>);

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config: Option<PathBuf>,
    image: Option<PathBuf>,
}

/// `[--config <file>] [--lang <code>] [image]`
fn parse_args(args: impl IntoIterator<Item = String>) -> CliArgs {
    let mut out = CliArgs::default();
    let mut it = args.into_iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--config" => out.config = it.next().map(PathBuf::from),
            "--lang" => {
                it.next();
            }
            _ if !a.starts_with("--") => out.image = Some(PathBuf::from(a)),
            _ => log::warn!("unknown argument {}", a),
        }
    }
    out
}

fn load_config(path: Option<&PathBuf>) -> ViewerConfig {
    let loaded = match path {
        Some(p) => ViewerConfig::load(p),
        None => ViewerConfig::discover(),
    };
    loaded.unwrap_or_else(|e| {
        log::error!("{}", i18n::tr_with("error.config", &[("err", e.to_string())]));
        ViewerConfig::default()
    })
}

/// 界面状态
struct UiState {
    show_fps: bool,
    vsync: bool,
    fullscreen: bool,
    is_loading: bool,
    fps: f32,
    current_lang: String,
    last_error: Option<String>,
    cursor: Vec2,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    i18n::init(i18n::resolve_lang_from_args());

    let args = parse_args(std::env::args());
    let config = load_config(args.config.as_ref());

    let event_loop = EventLoop::new();
    let window = match WindowBuilder::new()
        .with_title(i18n::tr("app.title"))
        .with_inner_size(LogicalSize::new(1280, 720))
        .build(&event_loop)
    {
        Ok(w) => w,
        Err(e) => {
            log::error!("cannot create window: {}", e);
            return;
        }
    };

    let mut renderer = match pollster::block_on(Renderer::new(&window, true)) {
        Ok(r) => r,
        Err(e) => {
            log::error!("cannot initialise GPU: {}", e);
            return;
        }
    };

    let size = window.inner_size();
    let startup_image = args.image.clone().or_else(|| config.image.clone());
    let frame_time = Duration::from_secs_f64(1.0 / config.fps.max(1) as f64);
    let mut loader = ImageTextureLoader::new(config.asset_dir.clone());
    let mut view = match PanoramaView::new(config, Viewport::new(size.width as f32, size.height as f32)) {
        Ok(v) => v,
        Err(e) => {
            log::error!("invalid viewer setup: {}", e);
            return;
        }
    };
    let mut motion = NoMotion;
    let orient = view.orient_to_device();
    view.set_orient_to_device(orient, &mut motion);
    renderer.upload_sphere(view.sphere());

    let mut tracker = TouchTracker::new();
    let mut ui = UiState {
        show_fps: false,
        vsync: true,
        fullscreen: false,
        is_loading: false,
        fps: 0.0,
        current_lang: i18n::current_lang(),
        last_error: None,
        cursor: Vec2::ZERO,
    };

    // FPS 计算
    let mut last_fps_time = Instant::now();
    let mut frame_count = 0u32;
    let mut next_frame = Instant::now();
    let mut applied_vsync = ui.vsync;

    // 异步加载通道
    let (tx, rx): (Sender<LoadResult>, Receiver<LoadResult>) = channel();

    if let Some(path) = startup_image {
        ui.is_loading = true;
        start_load_image(&loader, path, tx.clone());
    }

    event_loop.run(move |event, _, control_flow| {
        // 检查是否有新加载的图片
        if let Ok((path, result)) = rx.try_recv() {
            ui.is_loading = false;
            let applied = result.and_then(|rgba| view.set_image(rgba, &mut loader));
            match applied {
                Ok(info) => {
                    // the GPU copy is the only one kept
                    if let Some(img) = loader.take_image(info.id) {
                        renderer.load_panorama(&img);
                    }
                    ui.last_error = None;
                }
                Err(e) => {
                    let msg = i18n::tr_with("error.load_image", &[("err", e.to_string())]);
                    log::error!("{} ({})", msg, path.display());
                    ui.last_error = Some(msg);
                }
            }
        }

        match event {
            Event::WindowEvent { event, .. } => {
                // 先让 egui 处理事件
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed && !tracker.is_dragging() {
                    return;
                }

                let mut gestures: Vec<Gesture> = Vec::new();
                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                        view.resize(Viewport::new(new_size.width as f32, new_size.height as f32));
                    }

                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        renderer.resize(*new_inner_size);
                        view.resize(Viewport::new(
                            new_inner_size.width as f32,
                            new_inner_size.height as f32,
                        ));
                    }

                    // 键盘快捷键
                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed {
                            match input.virtual_keycode {
                                Some(VirtualKeyCode::O) => {
                                    if let Some(path) = pick_image() {
                                        ui.is_loading = true;
                                        start_load_image(&loader, path, tx.clone());
                                    }
                                }
                                Some(VirtualKeyCode::F11) => toggle_fullscreen(&window, &mut ui),
                                Some(VirtualKeyCode::R) => view.reset_view(),
                                _ => {}
                            }
                        }
                    }

                    // 鼠标交互
                    WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                        gestures.extend(tracker.mouse_button(state == ElementState::Pressed));
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        let p = Vec2::new(position.x as f32, position.y as f32);
                        ui.cursor = p;
                        gestures.extend(tracker.cursor_moved(p));
                    }

                    WindowEvent::CursorLeft { .. } => {
                        gestures.extend(tracker.cancel());
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        gestures.extend(match delta {
                            MouseScrollDelta::LineDelta(_, y) => tracker.wheel_lines(y),
                            MouseScrollDelta::PixelDelta(pos) => tracker.wheel_pixels(pos.y as f32),
                        });
                    }

                    WindowEvent::Touch(touch) => {
                        let p = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                        gestures.extend(tracker.touch(touch.id, touch.phase, p));
                    }

                    WindowEvent::DroppedFile(path) => {
                        ui.is_loading = true;
                        start_load_image(&loader, path, tx.clone());
                    }

                    _ => {}
                }

                for gesture in gestures {
                    match gesture {
                        Gesture::Pan(e) => {
                            view.handle_pan(e);
                        }
                        Gesture::Pinch(e) => {
                            view.handle_pinch(e);
                        }
                    }
                }
            }

            Event::RedrawRequested(_) => {
                // FPS 统计
                frame_count += 1;
                let now = Instant::now();
                let elapsed = now.duration_since(last_fps_time).as_secs_f32();
                if elapsed >= 1.0 {
                    ui.fps = frame_count as f32 / elapsed;
                    frame_count = 0;
                    last_fps_time = now;
                }

                view.update(motion.latest());
                view.draw(&tracker.input_state(), &mut renderer);

                let mut next_image = None;
                let render_result = renderer.render_with_ui(&window, |ctx| {
                    draw_ui(ctx, &mut view, &mut motion, &mut ui, &mut next_image, &window);
                });

                if let Some(path) = next_image {
                    ui.is_loading = true;
                    start_load_image(&loader, path, tx.clone());
                }
                if ui.vsync != applied_vsync {
                    renderer.set_vsync(ui.vsync);
                    applied_vsync = ui.vsync;
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::warn!("render error: {:?}", e),
                }
            }

            Event::MainEventsCleared => {
                let now = Instant::now();
                if now >= next_frame {
                    window.request_redraw();
                    next_frame = now + frame_time;
                }
                if *control_flow != ControlFlow::Exit {
                    *control_flow = ControlFlow::WaitUntil(next_frame);
                }
            }

            _ => {}
        }
    });
}

fn pick_image() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter(&i18n::tr("file.filter.images"), &IMAGE_EXTENSIONS)
        .pick_file()
}

fn toggle_fullscreen(window: &Window, ui: &mut UiState) {
    ui.fullscreen = !ui.fullscreen;
    if ui.fullscreen {
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        window.set_fullscreen(None);
    }
}

/// Decodes on a worker thread; the result is applied on the event loop.
fn start_load_image(loader: &ImageTextureLoader, path: PathBuf, tx: Sender<LoadResult>) {
    let resolved = loader.resolve(&path);
    thread::spawn(move || {
        log::info!(
            "{}",
            i18n::tr_with("log.loading_image_bg", &[("path", path.display().to_string())])
        );

        let result = resolved.and_then(|p| decode_image_file(&p)).map(|img| {
            log::info!(
                "{}",
                i18n::tr_with(
                    "log.image_loaded_size",
                    &[("w", img.width().to_string()), ("h", img.height().to_string())]
                )
            );
            img.to_rgba8()
        });

        if tx.send((path, result)).is_err() {
            log::error!("{}", i18n::tr("error.send_to_main_failed"));
        }
    });
}

fn draw_ui(
    ctx: &egui::Context,
    view: &mut PanoramaView,
    motion: &mut dyn MotionSource,
    ui_state: &mut UiState,
    next_image: &mut Option<PathBuf>,
    window: &Window,
) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            // File
            ui.menu_button(i18n::tr("menu.file"), |ui| {
                if ui.button(i18n::tr("menu.open_image")).clicked() {
                    ui.close_menu();
                    *next_image = pick_image();
                }
                if ui.button(i18n::tr("menu.exit")).clicked() {
                    std::process::exit(0);
                }
            });

            // View
            ui.menu_button(i18n::tr("menu.view"), |ui| {
                if ui.button(i18n::tr("view.reset")).clicked() {
                    view.reset_view();
                    ui.close_menu();
                }

                let fullscreen_label = if ui_state.fullscreen {
                    i18n::tr("view.fullscreen.exit")
                } else {
                    i18n::tr("view.fullscreen.enter")
                };
                if ui.button(fullscreen_label).clicked() {
                    toggle_fullscreen(window, ui_state);
                    ui.close_menu();
                }

                ui.separator();
                let mut touch_to_pan = view.touch_to_pan();
                if ui.checkbox(&mut touch_to_pan, i18n::tr("view.touch_to_pan")).changed() {
                    view.set_touch_to_pan(touch_to_pan);
                }
                let mut pinch_to_zoom = view.pinch_to_zoom();
                if ui.checkbox(&mut pinch_to_zoom, i18n::tr("view.pinch_to_zoom")).changed() {
                    view.set_pinch_to_zoom(pinch_to_zoom);
                }
                let mut show_touches = view.show_touches();
                if ui.checkbox(&mut show_touches, i18n::tr("view.show_touches")).changed() {
                    view.set_show_touches(show_touches);
                }
                ui.add_enabled_ui(motion.is_available(), |ui| {
                    let mut orient = view.orient_to_device();
                    if ui.checkbox(&mut orient, i18n::tr("view.orient_to_device")).changed() {
                        view.set_orient_to_device(orient, motion);
                    }
                });

                ui.separator();
                ui.menu_button(i18n::tr("view.orientation"), |ui| {
                    let options = [
                        (ScreenOrientation::Portrait, "orientation.portrait"),
                        (ScreenOrientation::PortraitUpsideDown, "orientation.upside_down"),
                        (ScreenOrientation::LandscapeLeft, "orientation.landscape_left"),
                        (ScreenOrientation::LandscapeRight, "orientation.landscape_right"),
                    ];
                    let mut current = view.orientation();
                    for (orientation, key) in options {
                        if ui.radio_value(&mut current, orientation, i18n::tr(key)).clicked() {
                            view.set_orientation(current);
                            ui.close_menu();
                        }
                    }
                });

                ui.separator();
                if ui.checkbox(&mut ui_state.show_fps, i18n::tr("view.show_fps")).clicked() {
                    ui.close_menu();
                }
                ui.checkbox(&mut ui_state.vsync, i18n::tr("view.enable_vsync"));
            });

            // Language
            ui.menu_button(i18n::tr("menu.language"), |ui| {
                for (code, name) in i18n::LANGUAGES {
                    if ui
                        .radio_value(&mut ui_state.current_lang, code.to_string(), name)
                        .clicked()
                    {
                        i18n::init(ui_state.current_lang.clone());
                        window.set_title(&i18n::tr("app.title"));
                        ui.close_menu();
                    }
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui_state.is_loading {
                ui.label(
                    egui::RichText::new(i18n::tr("status.loading_image"))
                        .color(egui::Color32::YELLOW),
                );
                ui.label("|");
            }

            let look = view.look();
            ui.label(format!("{}: {:.1}°", i18n::tr("status.fov"), view.field_of_view()));
            ui.label("|");
            ui.label(format!("{}: {:.1}°", i18n::tr("status.azimuth"), look.azimuth.to_degrees()));
            ui.label("|");
            ui.label(format!("{}: {:.1}°", i18n::tr("status.altitude"), look.altitude.to_degrees()));
            ui.label("|");

            let size = view.texture_size();
            if size == Vec2::ZERO {
                ui.label(i18n::tr("status.no_image"));
            } else {
                ui.label(format!("{}: {}×{}", i18n::tr("status.texture"), size.x, size.y));
                if let Some(px) = view.screen_to_texture_pixel(ui_state.cursor) {
                    ui.label(format!("({:.0}, {:.0})", px.x, px.y));
                }
            }

            if ui_state.show_fps {
                ui.label("|");
                ui.label(
                    egui::RichText::new(format!("FPS: {:.1}", ui_state.fps))
                        .color(egui::Color32::GREEN),
                );
            }

            if let Some(err) = &ui_state.last_error {
                ui.label("|");
                ui.label(egui::RichText::new(err).color(egui::Color32::RED));
            }
        });
    });
}
