use zonetri::{MesherBuilder, Point};

fn main() {
    let mesher = MesherBuilder::new(vec![
        Point::new(0., 0.),
        Point::new(10., 0.),
        Point::new(10., 10.),
        Point::new(0., 10.),
    ])
    .add_hole(vec![
        Point::new(4., 4.),
        Point::new(6., 4.),
        Point::new(6., 6.),
        Point::new(4., 6.),
    ])
    .build();

    let mesh = mesher.triangulate().unwrap();
    println!(
        "{} triangles covering an area of {}",
        mesh.triangle_count(),
        mesh.area()
    );
    for triangle in mesh {
        println!(
            "{:>3} {:>3} {:>3}  ({:?})",
            triangle.indices[0].as_u32(),
            triangle.indices[1].as_u32(),
            triangle.indices[2].as_u32(),
            triangle.points,
        );
    }
}
