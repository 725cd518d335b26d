use std::collections::{HashMap, HashSet};
use std::path::Path;

use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Name, Pdf, Rect, Ref, Str};
use subsetter::GlyphRemapper;
use ttf_parser::Face;

/// Which of the two label faces a font serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum FontRole {
    /// Location line(s).
    Regular,
    /// Display ID line.
    Bold,
}

impl FontRole {
    pub(crate) fn standard_name(self) -> &'static str {
        match self {
            FontRole::Regular => "Helvetica",
            FontRole::Bold => "Helvetica-Bold",
        }
    }
}

enum Advances {
    /// WinAnsi chars 32..=255 in 1000-units.
    WinAnsi(Vec<f32>),
    /// Chars of an embedded subset in 1000-units. Anything else has no glyph.
    Subset(HashMap<char, f32>),
}

/// Advance widths and vertical metrics used to lay out label text.
pub(crate) struct FontMetrics {
    advances: Advances,
    pub(crate) line_h_ratio: f32,
    pub(crate) ascender_ratio: f32,
}

impl FontMetrics {
    /// Metrics of the built-in Helvetica faces (AFM widths for ASCII).
    pub(crate) fn standard(role: FontRole) -> Self {
        let bold = role == FontRole::Bold;
        Self {
            advances: Advances::WinAnsi(helvetica_widths(bold)),
            line_h_ratio: if bold { 1.19 } else { 1.156 },
            ascender_ratio: 0.718,
        }
    }

    pub(crate) fn char_width_1000(&self, ch: char) -> f32 {
        match &self.advances {
            Advances::Subset(widths) => widths.get(&ch).copied().unwrap_or(0.0),
            Advances::WinAnsi(_) if ch.is_control() => 0.0,
            Advances::WinAnsi(widths) => {
                let byte = char_to_winansi(ch).unwrap_or(b'?');
                widths[usize::from(byte - 32)]
            }
        }
    }

    pub(crate) fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars()
            .map(|ch| self.char_width_1000(ch) * font_size / 1000.0)
            .sum()
    }

    pub(crate) fn line_height(&self, font_size: f32) -> f32 {
        font_size * self.line_h_ratio
    }

    pub(crate) fn ascent(&self, font_size: f32) -> f32 {
        font_size * self.ascender_ratio
    }
}

pub(crate) struct FontEntry {
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    pub(crate) metrics: FontMetrics,
    glyphs: Option<HashMap<char, u16>>,
}

impl FontEntry {
    /// Bytes for a `Tj` string: big-endian glyph IDs for an embedded
    /// Identity-H font, WinAnsi otherwise.
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match &self.glyphs {
            Some(glyphs) => text
                .chars()
                .flat_map(|ch| glyphs.get(&ch).copied().unwrap_or(0).to_be_bytes())
                .collect(),
            None => to_winansi_bytes(text),
        }
    }
}

/// Windows-1252 code points in 0x80..=0x9F, the only range where it
/// departs from Latin-1.
const WINANSI_HIGH: [(u8, char); 27] = [
    (0x80, '\u{20AC}'),
    (0x82, '\u{201A}'),
    (0x83, '\u{0192}'),
    (0x84, '\u{201E}'),
    (0x85, '\u{2026}'),
    (0x86, '\u{2020}'),
    (0x87, '\u{2021}'),
    (0x88, '\u{02C6}'),
    (0x89, '\u{2030}'),
    (0x8A, '\u{0160}'),
    (0x8B, '\u{2039}'),
    (0x8C, '\u{0152}'),
    (0x8E, '\u{017D}'),
    (0x91, '\u{2018}'),
    (0x92, '\u{2019}'),
    (0x93, '\u{201C}'),
    (0x94, '\u{201D}'),
    (0x95, '\u{2022}'),
    (0x96, '\u{2013}'),
    (0x97, '\u{2014}'),
    (0x98, '\u{02DC}'),
    (0x99, '\u{2122}'),
    (0x9A, '\u{0161}'),
    (0x9B, '\u{203A}'),
    (0x9C, '\u{0153}'),
    (0x9E, '\u{017E}'),
    (0x9F, '\u{0178}'),
];

fn char_to_winansi(c: char) -> Option<u8> {
    match u32::from(c) {
        0x20..=0x7E | 0xA0..=0xFF => u8::try_from(u32::from(c)).ok(),
        _ => WINANSI_HIGH
            .iter()
            .find(|&&(_, ch)| ch == c)
            .map(|&(byte, _)| byte),
    }
}

/// WinAnsi bytes for a PDF string. Unmappable chars become `?`.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .filter(|c| !c.is_control())
        .map(|c| char_to_winansi(c).unwrap_or(b'?'))
        .collect()
}

/// Helvetica / Helvetica-Bold widths at 1000 units/em for WinAnsi chars 32..=255.
/// ASCII comes from the AFM files; the upper half is approximated.
fn helvetica_widths(bold: bool) -> Vec<f32> {
    const REGULAR_ASCII: [u16; 95] = [
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
        1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
        667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
        333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
        556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
    ];
    const BOLD_ASCII: [u16; 95] = [
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 48-63
        975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 64-79
        667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 80-95
        333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 96-111
        611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 112-126
    ];
    let ascii = if bold { &BOLD_ASCII } else { &REGULAR_ASCII };
    (32u8..=255u8)
        .map(|b| match b {
            32..=126 => f32::from(ascii[usize::from(b - 32)]),
            0x85 | 0x97 | 0x89 | 0x99 => 1000.0, // ellipsis, em dash, per mille, trademark
            0x95 => 350.0,                       // bullet
            0x91..=0x94 => 333.0,                // curly quotes
            0xA0 => 278.0,                       // nbsp
            0xC0..=0xDE => 722.0,                // accented capitals
            _ => 556.0,
        })
        .collect()
}

fn identity() -> SystemInfo<'static> {
    SystemInfo {
        registry: Str(b"Adobe"),
        ordering: Str(b"Identity"),
        supplement: 0,
    }
}

/// Glyphs of the label text in a subset face: new glyph ID and advance per char.
struct LabelGlyphs {
    remapper: GlyphRemapper,
    gids: HashMap<char, u16>,
    widths: HashMap<char, f32>,
}

impl LabelGlyphs {
    fn collect(face: &Face, used_chars: &HashSet<char>, font_name: &str) -> Self {
        let to_1000 = 1000.0 / f32::from(face.units_per_em());
        // Sorted so subset glyph IDs do not depend on hash order.
        let mut chars: Vec<char> = used_chars.iter().copied().collect();
        chars.sort_unstable();

        let mut glyphs = LabelGlyphs {
            remapper: GlyphRemapper::new(),
            gids: HashMap::new(),
            widths: HashMap::new(),
        };
        for ch in chars {
            let Some(gid) = face.glyph_index(ch) else {
                log::debug!("{font_name} has no glyph for {ch:?}");
                continue;
            };
            glyphs.gids.insert(ch, glyphs.remapper.remap(gid.0));
            let advance = face.glyph_hor_advance(gid).unwrap_or(0);
            glyphs.widths.insert(ch, f32::from(advance) * to_1000);
        }
        glyphs
    }

    /// `(new gid, width)` in ascending gid order, one entry per glyph.
    fn widths_by_gid(&self) -> Vec<(u16, f32)> {
        let mut out: Vec<(u16, f32)> = self
            .gids
            .iter()
            .map(|(ch, &gid)| (gid, self.widths.get(ch).copied().unwrap_or(0.0)))
            .collect();
        out.sort_by_key(|&(gid, _)| gid);
        out.dedup_by_key(|&mut (gid, _)| gid);
        out
    }

    fn to_unicode(&self, cmap_name: &str) -> Vec<u8> {
        let mut pairs: Vec<(u16, char)> = self.gids.iter().map(|(&ch, &gid)| (gid, ch)).collect();
        pairs.sort_unstable();
        let mut cmap = UnicodeCmap::new(Name(cmap_name.as_bytes()), identity());
        for (gid, ch) in pairs {
            cmap.pair(gid, ch);
        }
        cmap.finish().into_vec()
    }
}

/// Embed a TrueType face as a Type0 font over a CIDFontType2 descendant,
/// addressed by glyph ID (Identity-H) and subset to `used_chars`.
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    font_name: &str,
    font_data: &[u8],
    used_chars: &HashSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> Option<(FontMetrics, HashMap<char, u16>)> {
    let face = match Face::parse(font_data, 0) {
        Ok(face) => face,
        Err(e) => {
            log::warn!("Cannot parse font {font_name}: {e}");
            return None;
        }
    };
    let units = f32::from(face.units_per_em());
    let to_1000 = |v: i16| f32::from(v) * 1000.0 / units;

    let glyphs = LabelGlyphs::collect(&face, used_chars, font_name);
    let font_file = subsetter::subset(font_data, 0, &glyphs.remapper).unwrap_or_else(|e| {
        log::warn!("Font subsetting failed for {font_name}: {e}, embedding full font");
        font_data.to_vec()
    });
    let file_len = i32::try_from(font_file.len()).ok()?;

    let base_font: String = font_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    let base_font = if base_font.is_empty() { "LabelFont".to_owned() } else { base_font };
    let [descriptor_ref, file_ref, cid_ref, cmap_ref] = [(); 4].map(|_| alloc());

    pdf.stream(file_ref, &font_file).pair(Name(b"Length1"), file_len);

    let bb = face.global_bounding_box();
    pdf.font_descriptor(descriptor_ref)
        .name(Name(base_font.as_bytes()))
        .flags(FontFlags::NON_SYMBOLIC)
        .bbox(Rect::new(to_1000(bb.x_min), to_1000(bb.y_min), to_1000(bb.x_max), to_1000(bb.y_max)))
        .italic_angle(0.0)
        .ascent(to_1000(face.ascender()))
        .descent(to_1000(face.descender()))
        .cap_height(face.capital_height().map_or(700.0, to_1000))
        .stem_v(80.0)
        .font_file2(file_ref);

    let widths = glyphs.widths_by_gid();
    let mut cid = pdf.cid_font(cid_ref);
    cid.subtype(CidFontType::Type2)
        .base_font(Name(base_font.as_bytes()))
        .system_info(identity())
        .font_descriptor(descriptor_ref)
        .default_width(0.0)
        .cid_to_gid_map_predefined(Name(b"Identity"));
    if !widths.is_empty() {
        let mut w = cid.widths();
        for (gid, width) in widths {
            w.consecutive(gid, [width]);
        }
    }
    drop(cid);

    let cmap = glyphs.to_unicode(&format!("{base_font}-UTF16"));
    pdf.stream(cmap_ref, &cmap);

    pdf.type0_font(font_ref)
        .base_font(Name(base_font.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_ref)
        .to_unicode(cmap_ref);

    let extent = f32::from(face.ascender()) - f32::from(face.descender()) + f32::from(face.line_gap());
    let metrics = FontMetrics {
        advances: Advances::Subset(glyphs.widths),
        line_h_ratio: extent / units,
        ascender_ratio: f32::from(face.ascender()) / units,
    };
    Some((metrics, glyphs.gids))
}

/// Register the font serving `role`. A configured TrueType file is embedded
/// (subset to `used_chars`); when absent or unreadable the standard Helvetica
/// face is referenced instead.
pub(crate) fn register_font(
    pdf: &mut Pdf,
    role: FontRole,
    pdf_name: String,
    truetype_path: Option<&Path>,
    used_chars: &HashSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> FontEntry {
    let t0 = std::time::Instant::now();
    let font_ref = alloc();

    let embedded = truetype_path.and_then(|path| {
        let data = std::fs::read(path)
            .map_err(|e| log::warn!("Cannot read font {}: {e}", path.display()))
            .ok()?;
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("LabelFont");
        embed_truetype(pdf, font_ref, name, &data, used_chars, alloc)
    });

    let (metrics, glyphs) = match embedded {
        Some((metrics, gids)) => (metrics, Some(gids)),
        None => {
            if let Some(path) = truetype_path {
                log::warn!("Font not usable: {}, using {}", path.display(), role.standard_name());
            }
            pdf.type1_font(font_ref)
                .base_font(Name(role.standard_name().as_bytes()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
            (FontMetrics::standard(role), None)
        }
    };

    log::debug!(
        "register_font: {role:?} embedded={} in {:.1}ms",
        glyphs.is_some(),
        t0.elapsed().as_secs_f64() * 1000.0,
    );

    FontEntry {
        pdf_name,
        font_ref,
        metrics,
        glyphs,
    }
}
