use std::env;
use std::path::PathBuf;

use point_cloud_normal_engine::engine::core::app_setup::create_app;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [cloud.ply|cloud.las|cloud.laz]", args[0]);
        std::process::exit(1);
    }

    let cloud_path = args.get(1).map(PathBuf::from);
    create_app(cloud_path).run();
}
