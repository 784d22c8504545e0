// i18n.rs: 运行时界面文本
//
// Strings come from assets/i18n/<lang>.json (flat "key": "text" maps),
// searched next to the executable and then in the working directory.
// Lookup order: selected language, fallback language file, built-in English.
// Language: --lang <code>, then PANORAMA_LANG, then "en".

use once_cell::sync::OnceCell;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

pub const FALLBACK_LANG: &str = "en";

pub const LANGUAGES: [(&str, &str); 2] = [("en", "English"), ("zh-Hans", "简体中文")];

const BUILTIN: &[(&str, &str)] = &[
    ("app.title", "Panorama VR"),
    ("menu.file", "File"),
    ("menu.open_image", "Open image…"),
    ("menu.exit", "Exit"),
    ("menu.view", "View"),
    ("menu.language", "Language"),
    ("view.reset", "Reset view"),
    ("view.fullscreen.enter", "Enter fullscreen"),
    ("view.fullscreen.exit", "Exit fullscreen"),
    ("view.touch_to_pan", "Drag to pan"),
    ("view.pinch_to_zoom", "Wheel / pinch to zoom"),
    ("view.show_touches", "Show touch rings"),
    ("view.orient_to_device", "Follow device motion"),
    ("view.orientation", "Screen orientation"),
    ("orientation.portrait", "Portrait"),
    ("orientation.upside_down", "Upside down"),
    ("orientation.landscape_left", "Landscape left"),
    ("orientation.landscape_right", "Landscape right"),
    ("view.show_fps", "Show FPS"),
    ("view.enable_vsync", "VSync"),
    ("file.filter.images", "Images"),
    ("status.loading_image", "Loading image…"),
    ("status.no_image", "No image"),
    ("status.fov", "FOV"),
    ("status.azimuth", "Azimuth"),
    ("status.altitude", "Altitude"),
    ("status.texture", "Texture"),
    ("log.loading_image_bg", "Loading image in background: {path}"),
    ("log.image_loaded_size", "Image decoded: {w} x {h}"),
    ("error.load_image", "Could not load image: {err}"),
    ("error.send_to_main_failed", "Image decoded but the viewer has already closed"),
    ("error.config", "Config error, using defaults: {err}"),
    ("gpu.image_too_large_scaled", "Image {src_w}x{src_h} exceeds GPU limit {max}; scaled to {new_w}x{new_h}"),
    ("font.not_found", "No CJK-capable UI font found; using egui defaults"),
    ("font.using", "UI font: {path}"),
];

#[derive(Debug, Clone)]
pub struct I18n {
    pub lang: String,
    map: HashMap<String, String>,
    fallback_map: HashMap<String, String>,
}

impl I18n {
    fn lookup(&self, key: &str) -> String {
        if let Some(v) = self.map.get(key).or_else(|| self.fallback_map.get(key)) {
            return v.clone();
        }
        builtin(key).unwrap_or(key).to_string()
    }
}

static I18N: OnceCell<RwLock<I18n>> = OnceCell::new();

fn builtin(key: &str) -> Option<&'static str> {
    BUILTIN.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn load_json_map(path: &Path) -> Option<HashMap<String, String>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("cannot read {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(map) => Some(map),
        Err(e) => {
            log::warn!("ignoring malformed {}: {}", path.display(), e);
            None
        }
    }
}

fn find_lang_file(lang: &str) -> Option<PathBuf> {
    let file = format!("{}.json", lang);
    let mut roots = Vec::new();
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            roots.push(dir.join("assets"));
        }
    }
    roots.push(PathBuf::from("assets"));

    roots
        .into_iter()
        .map(|root| root.join("i18n").join(&file))
        .find(|p| p.exists())
}

fn load_lang(lang: &str) -> HashMap<String, String> {
    match find_lang_file(lang).and_then(|p| load_json_map(&p)) {
        Some(map) => map,
        None => {
            log::debug!("no translation file for '{}'", lang);
            HashMap::new()
        }
    }
}

/// Initialize global i18n. Later calls replace the active language.
pub fn init(lang: impl Into<String>) {
    let lang = lang.into();
    let map = load_lang(&lang);
    let fallback_map = if lang == FALLBACK_LANG {
        HashMap::new()
    } else {
        load_lang(FALLBACK_LANG)
    };

    let i = I18n {
        lang,
        map,
        fallback_map,
    };

    if let Some(lock) = I18N.get() {
        if let Ok(mut w) = lock.write() {
            *w = i;
        }
    } else {
        let _ = I18N.set(RwLock::new(i));
    }
}

pub fn current_lang() -> String {
    I18N.get()
        .and_then(|l| l.read().ok().map(|i| i.lang.clone()))
        .unwrap_or_else(|| FALLBACK_LANG.to_string())
}

/// Localized text for `key`. Falls back to the built-in English text, then
/// to the key itself.
pub fn tr(key: &str) -> String {
    match I18N.get().and_then(|l| l.read().ok()) {
        Some(i) => i.lookup(key),
        None => builtin(key).unwrap_or(key).to_string(),
    }
}

/// Localized text with `{name}` placeholders substituted. Unknown
/// placeholders stay as they are.
pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    substitute(tr(key), args)
}

fn substitute(mut s: String, args: &[(&str, String)]) -> String {
    for (k, v) in args {
        s = s.replace(&format!("{{{}}}", k), v);
    }
    s
}

/// Language from `--lang <code>`, then `env_lang`, then the fallback.
pub fn resolve_lang(args: impl IntoIterator<Item = String>, env_lang: Option<String>) -> String {
    let mut it = args.into_iter();
    while let Some(a) = it.next() {
        if a == "--lang" {
            if let Some(v) = it.next() {
                return v;
            }
        }
    }

    env_lang
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_LANG.to_string())
}

pub fn resolve_lang_from_args() -> String {
    resolve_lang(std::env::args(), std::env::var("PANORAMA_LANG").ok())
}
