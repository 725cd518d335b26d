mod common;

use labelsheet::{EcLevel, QrFormat, QrOptions, generate_qr};

/// Decode the single QR symbol in `img`, padded with white so detection does
/// not depend on the quiet-zone width under test.
fn decode(img: &image::GrayImage) -> String {
    let border = 32;
    let mut img_padded = image::GrayImage::from_pixel(
        img.width() + 2 * border,
        img.height() + 2 * border,
        image::Luma([255u8]),
    );
    image::imageops::overlay(&mut img_padded, img, border as i64, border as i64);
    let img = &img_padded;
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        img.width() as usize,
        img.height() as usize,
        |x, y| img.get_pixel(x as u32, y as u32).0[0],
    );
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "expected exactly one QR symbol");
    let (_meta, content) = grids[0].decode().expect("decodable QR");
    content
}

#[test]
fn urls_survive_encode_then_decode() {
    for (url, level) in [
        ("http://localhost:3000/packages/a1", EcLevel::M),
        ("https://inventory.example.org/packages/0b7f1c2e-9d4a-4f7e-8a51-3c2d9e6f0a11", EcLevel::M),
        ("http://h/packages/with%20escapes?x=1&y=2", EcLevel::L),
        ("http://localhost:3000/packages/a1", EcLevel::H),
    ] {
        let options = QrOptions {
            ec_level: level,
            ..QrOptions::default()
        };
        let code = generate_qr(url, &options).unwrap();
        assert_eq!(decode(&code.to_luma(6)), url);
    }
}

#[test]
fn package_png_decodes_to_its_detail_url() {
    let image = common::service()
        .package_qr("a1", QrFormat::Png, 250)
        .unwrap();
    assert_eq!(image.content_type, "image/png");

    let img = image::load_from_memory_with_format(&image.bytes, image::ImageFormat::Png)
        .unwrap()
        .to_luma8();
    assert!(img.width() <= 250 && img.width() > 150);
    assert_eq!(decode(&img), "http://localhost:3000/packages/a1");
}

#[test]
fn package_svg_is_scalable_markup() {
    let image = common::service()
        .package_qr("c3", QrFormat::Svg, 250)
        .unwrap();
    assert_eq!(image.content_type, "image/svg+xml");
    let svg = String::from_utf8(image.bytes).unwrap();
    assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
    assert!(svg.contains("shape-rendering=\"crispEdges\""));
}

#[test]
fn reserved_characters_in_ids_stay_inside_the_path() {
    let id = "a b/c?d";
    let service = labelsheet::LabelService::new(
        labelsheet::MemoryStore::new([labelsheet::PackageRecord::new(id, "PKG-X", "Shed")]),
        labelsheet::LabelConfig::default(),
    )
    .unwrap();
    let image = service.package_qr(id, QrFormat::Png, 250).unwrap();
    let img = image::load_from_memory_with_format(&image.bytes, image::ImageFormat::Png)
        .unwrap()
        .to_luma8();

    let url = decode(&img);
    assert_eq!(url, "http://localhost:3000/packages/a%20b%2Fc%3Fd");
    let segment = url.rsplit('/').next().unwrap();
    assert!(!segment.contains('?'));
    let decoded = percent_encoding::percent_decode_str(segment).decode_utf8().unwrap();
    assert_eq!(decoded, id);
}
