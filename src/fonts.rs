// fonts.rs: egui UI 字体搜索 (CJK / 阿拉伯语等)

use std::path::{Path, PathBuf};

const WINDOWS_FONTS: &[&str] = &[
    "msyh.ttf",
    "simhei.ttf",
    "simsun.ttf",
    "Deng.ttf",
    "meiryo.ttf",
    "yumin.ttf",
    "malgun.ttf",
    "segoeui.ttf",
    "tahoma.ttf",
    "arialuni.ttf",
];

const MACOS_FONTS: &[&str] = &[
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/Hiragino Sans GB.ttc",
    "/System/Library/Fonts/AppleSDGothicNeo.ttc",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "/Library/Fonts/NotoSansSC-Regular.otf",
];

const LINUX_FONTS: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansSC-Regular.otf",
    "/usr/share/fonts/truetype/noto/NotoSansSC-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSansArabic-Regular.ttf",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
];

const HOME_FONTS: &[&str] = &[
    ".local/share/fonts/NotoSansCJK-Regular.ttc",
    ".local/share/fonts/NotoSansSC-Regular.ttf",
    ".fonts/NotoSansSC-Regular.ttf",
    "Library/Fonts/NotoSansSC-Regular.otf",
];

// 随程序分发的字体 (assets/fonts)
const ASSET_FONTS: &[&str] = &[
    "NotoSansSC-Regular.otf",
    "NotoSansSC-Regular.ttf",
    "NotoSansCJK-Regular.ttc",
    "NotoSans-Regular.ttf",
    "NotoSansArabic-Regular.ttf",
];

/// Font files to try, system locations first, then the asset directories.
pub fn candidate_paths(asset_dirs: &[PathBuf], home: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if cfg!(windows) {
        let root = PathBuf::from(r"C:\Windows\Fonts");
        candidates.extend(WINDOWS_FONTS.iter().map(|f| root.join(f)));
    } else if cfg!(target_os = "macos") {
        candidates.extend(MACOS_FONTS.iter().map(PathBuf::from));
    } else if cfg!(unix) {
        candidates.extend(LINUX_FONTS.iter().map(PathBuf::from));
    }

    if let Some(home) = home {
        candidates.extend(HOME_FONTS.iter().map(|f| home.join(f)));
    }

    for dir in asset_dirs {
        candidates.extend(ASSET_FONTS.iter().map(|f| dir.join("fonts").join(f)));
    }
    candidates
}

/// Reads the file and keeps it only if ab_glyph can parse it; `.ttc`
/// collections frequently fail and are skipped.
fn load_font(path: &Path) -> Option<Vec<u8>> {
    let bytes = std::fs::read(path).ok()?;
    ab_glyph::FontRef::try_from_slice(&bytes).ok()?;
    Some(bytes)
}

fn asset_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            dirs.push(dir.join("assets"));
        }
    }
    dirs.push(PathBuf::from("assets"));
    dirs
}

/// Puts the first usable font in front of egui's proportional and monospace
/// families. Without one egui keeps its Latin-only defaults.
pub fn install_ui_fonts(ctx: &egui::Context) {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let chosen = candidate_paths(&asset_dirs(), home.as_deref())
        .into_iter()
        .find_map(|p| load_font(&p).map(|bytes| (p, bytes)));

    let Some((font_path, font_bytes)) = chosen else {
        log::warn!("{}", crate::i18n::tr("font.not_found"));
        return;
    };
    log::info!(
        "{}",
        crate::i18n::tr_with("font.using", &[("path", font_path.display().to_string())])
    );

    let mut fonts = egui::FontDefinitions::default();
    fonts
        .font_data
        .insert("ui".to_owned(), egui::FontData::from_owned(font_bytes));
    for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
        if let Some(list) = fonts.families.get_mut(&family) {
            list.insert(0, "ui".to_owned());
        }
    }
    ctx.set_fonts(fonts);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_fonts_come_last() {
        let dirs = vec![PathBuf::from("/opt/viewer/assets")];
        let candidates = candidate_paths(&dirs, Some(Path::new("/home/u")));
        let last = candidates.last().unwrap();
        assert_eq!(
            last,
            &PathBuf::from("/opt/viewer/assets/fonts/NotoSansArabic-Regular.ttf")
        );
        assert!(candidates.iter().any(|p| p.starts_with("/home/u")));
    }

    #[test]
    fn test_unparseable_font_is_skipped() {
        let dir = std::env::temp_dir().join(format!("panorama_fonts_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(load_font(&path).is_none());
        assert!(load_font(&dir.join("missing.ttf")).is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
