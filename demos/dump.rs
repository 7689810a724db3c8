use dvbsub_decoder::{pts_format_args, ComposedPage, Decoder, FixedArray, Presenter};
use log::info;
use pretty_env_logger;
use std::env;
use std::fs;

struct Dump;

impl Presenter for Dump {
    fn present(&mut self, page: &ComposedPage<'_>) {
        let pts = page.pts().unwrap_or(0);
        println!(
            "{} page {} v{} on {:?}, {} s",
            pts_format_args!(pts),
            page.page_id(),
            page.version(),
            page.canvas(),
            page.timeout_secs()
        );
        for region in page.regions() {
            let mut pixels = vec![0_u32; region.width() * region.height()];
            region.render_argb(&mut pixels);
            let opaque = pixels.iter().filter(|&&argb| argb >> 24 != 0).count();
            println!(
                "  region {} at {:?}, {}-bit, {} opaque pixels",
                region.id(),
                region.rect(),
                region.depth().bits(),
                opaque
            );
        }
    }

    fn clear(&mut self, page_id: u16) {
        println!("page {} cleared", page_id);
    }
}

fn main() {
    pretty_env_logger::init();
    let args = env::args();
    if args.len() < 2 {
        panic!("No file argument");
    }
    let file_path = args.skip(1).next().unwrap();
    let data = fs::read(file_path).expect("unable to read!");

    let mut decoder = Decoder::default();
    let mut offset = 0;
    while data.len() - offset >= 6 {
        let length = 6 + u16::from_be_bytes([data[offset + 4], data[offset + 5]]) as usize;
        let packet = &data[offset..data.len().min(offset + length)];
        offset += length.min(data.len() - offset);

        let report = decoder.process_pes_packet(packet);
        for error in report.errors.iter() {
            println!("error: {}", error);
        }
        if let Some(pts) = report.pts {
            decoder.expire_pages(pts);
        }
        decoder.draw(&mut Dump);
    }
    info!("{:?}", decoder.pool_usage());
}
