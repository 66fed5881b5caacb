use std::{io::Cursor, path::PathBuf};

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_uniframes")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "uniframes.exe"
            } else {
                "uniframes"
            });
            p
        })
}

fn write_png(path: &std::path::Path, img: image::RgbaImage) {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(path, &buf).unwrap();
}

fn fixture_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("cli_smoke").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn cli_crop_writes_jpeg_of_rect_size() {
    let dir = fixture_dir("crop");
    let photo = dir.join("photo.png");
    let out = dir.join("crop.jpg");
    let _ = std::fs::remove_file(&out);
    write_png(
        &photo,
        image::RgbaImage::from_pixel(120, 80, image::Rgba([10, 120, 240, 255])),
    );

    let status = std::process::Command::new(exe())
        .args(["crop", "--rect", "10,10,40,30", "--photo"])
        .arg(&photo)
        .arg("--out")
        .arg(&out)
        .status()
        .unwrap();

    assert!(status.success());
    let img = image::open(&out).unwrap();
    assert_eq!((img.width(), img.height()), (40, 30));
}

#[test]
fn cli_compose_exports_named_png() {
    let dir = fixture_dir("compose");
    let photo = dir.join("photo.png");
    let frame = dir.join("frame.png");
    let settings = dir.join("settings.json");
    let out_dir = dir.join("out");
    let expected = out_dir.join("Test_University_profile_photo.png");
    let _ = std::fs::remove_file(&expected);

    write_png(
        &photo,
        image::RgbaImage::from_pixel(90, 60, image::Rgba([200, 200, 20, 255])),
    );
    write_png(
        &frame,
        image::RgbaImage::from_pixel(50, 50, image::Rgba([0, 0, 0, 0])),
    );
    std::fs::write(&settings, r#"{"base_size": 50, "supersample": 2}"#).unwrap();

    let status = std::process::Command::new(exe())
        .arg("compose")
        .arg("--settings")
        .arg(&settings)
        .arg("--photo")
        .arg(&photo)
        .arg("--frame")
        .arg(&frame)
        .args(["--university", "Test University", "--dpr", "2"])
        .arg("--out-dir")
        .arg(&out_dir)
        .status()
        .unwrap();

    assert!(status.success());
    let img = image::open(&expected).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (200, 200));
    assert_eq!(img.get_pixel(0, 0).0[3], 0);
    assert_eq!(img.get_pixel(100, 100).0[3], 255);
}

#[test]
fn cli_rejects_malformed_rect() {
    let status = std::process::Command::new(exe())
        .args(["crop", "--photo", "x.png", "--rect", "1,2,3", "--out", "y.jpg"])
        .stderr(std::process::Stdio::null())
        .status()
        .unwrap();
    assert!(!status.success());
}
