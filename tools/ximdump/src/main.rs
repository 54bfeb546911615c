//! `.xim` 文件检查工具.
//!
//! 打印头部, 直方图概要与属性表, 可选导出像素网格为 PNG.

use epid_berry::prelude::*;
use log::info;
use std::process::ExitCode;

const USAGE: &str = "用法: ximdump [--no-pixels] [--png <out.png>] [--vis <out.png>] <file.xim>";

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .expect("初始化日志失败");

    let mut no_pixels = false;
    let mut png: Option<String> = None;
    let mut vis: Option<String> = None;
    let mut file: Option<String> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--no-pixels" {
            no_pixels = true;
        } else if arg == "--png" {
            png = args.next();
        } else if arg == "--vis" {
            vis = args.next();
        } else {
            file = Some(arg);
        }
    }
    let Some(file) = file else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let img = match XimImage::open(&file, !no_pixels) {
        Ok(img) => img,
        Err(e) => {
            eprintln!("解析 {file} 失败: {e:?}");
            return ExitCode::FAILURE;
        }
    };
    info!("已解析 {file}");

    report(&img);

    for (path, raw) in [(png, true), (vis, false)] {
        let Some(path) = path else { continue };
        if !export(&img, &path, raw) {
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

/// 打印一份人类可读的概要.
fn report(img: &XimImage) {
    let h = img.header();
    println!("格式版本:   {}", h.format_version);
    println!("尺寸:       {} x {} (高 x 宽)", h.height, h.width);
    println!("像素宽度:   {} bit ({} 字节)", h.bits_per_pixel, h.bytes_per_pixel);
    println!("压缩:       {}", if h.compressed { "是" } else { "否" });
    if let Some(a) = img.array() {
        let lo = a.iter().min().copied().unwrap_or(0);
        let hi = a.iter().max().copied().unwrap_or(0);
        println!("像素范围:   [{lo}, {hi}]");
    }
    if !img.histogram().is_empty() {
        println!("直方图:     {} bins", img.histogram().len());
    }
    println!("属性 ({} 条):", img.properties().len());
    for (name, value) in img.properties().iter() {
        println!("  {name} = {value}");
    }
}

/// 导出像素网格. `raw` 为真时按原样写 16-bit PNG, 否则按拟合窗口写 8-bit PNG.
fn export(img: &XimImage, path: &str, raw: bool) -> bool {
    let Some(array) = img.array() else {
        eprintln!("--no-pixels 模式下没有像素网格可导出");
        return false;
    };
    let result = if raw {
        array.save_raw(path)
    } else {
        match DisplayWindow::fit(array.view()) {
            Some(window) => array.save_vis(path, window),
            None => {
                eprintln!("空网格无法导出");
                return false;
            }
        }
    };
    match result {
        Ok(()) => {
            info!("已写出 {path}");
            true
        }
        Err(e) => {
            eprintln!("写出 {path} 失败: {e}");
            false
        }
    }
}
