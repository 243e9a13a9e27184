// Example: how free-form OSM height tags are read
use osm_buildings::parse_height;

fn main() {
    println!("=== Example: parsing OSM height values ===\n");

    for raw in ["12", "12.5 m", "40ft", "5'6\"", "unknown", "~12", ""] {
        println!("  {:>10} -> {:.4} m", format!("{:?}", raw), parse_height(raw));
    }
}
