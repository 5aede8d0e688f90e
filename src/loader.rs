use crate::{Float, MesherBuilder, Point};

#[derive(thiserror::Error, Debug)]
pub enum LoaderError {
    #[error("IO error")]
    Io(#[from] std::io::Error),
    #[error("malformed point on line {line}: {text:?}")]
    Malformed { line: usize, text: String },
}

/// Loaders produce a ready [`MesherBuilder`] from some source, e.g. a
/// zone file on disk.
pub trait Loader {
    fn load(&mut self, source: &str) -> Result<MesherBuilder, LoaderError>;
}

/// Loads plain text zone files: one `x y` pair per line for the outline,
/// a line `HOLE` starts a hole polyline, a line `STEINER` switches to
/// sparse points. Blank lines are skipped.
#[derive(Default)]
pub struct PlainFileLoader {}

#[derive(Default)]
enum ParseState {
    #[default]
    Outline,
    Hole,
    Steiner,
}

impl Loader for PlainFileLoader {
    fn load(&mut self, path: &str) -> Result<MesherBuilder, LoaderError> {
        let value = std::fs::read_to_string(path)?;

        let mut state = ParseState::default();
        let mut outline = vec![];
        let mut holes = Vec::<Vec<Point>>::new();
        let mut steiner_points = Vec::<Point>::new();

        for (line_no, line) in value.lines().enumerate() {
            if line.eq("HOLE") {
                state = ParseState::Hole;
                holes.push(vec![]);
                continue;
            } else if line.eq("STEINER") {
                state = ParseState::Steiner;
                continue;
            }
            let Some(point) = parse_point(line, line_no + 1)? else {
                continue;
            };

            match state {
                ParseState::Outline => outline.push(point),
                ParseState::Hole => match holes.last_mut() {
                    Some(current_hole) => current_hole.push(point),
                    None => unreachable!("hole state without hole"),
                },
                ParseState::Steiner => steiner_points.push(point),
            }
        }

        Ok(MesherBuilder::new(outline)
            .add_holes(holes)
            .add_steiner_points(steiner_points))
    }
}

fn parse_point(line: &str, line_no: usize) -> Result<Option<Point>, LoaderError> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let malformed = || LoaderError::Malformed {
        line: line_no,
        text: line.to_string(),
    };

    let mut iter = line.split_whitespace();
    let x = iter.next().ok_or_else(malformed)?;
    let y = iter.next().ok_or_else(malformed)?;
    let x = x.parse::<Float>().map_err(|_| malformed())?;
    let y = y.parse::<Float>().map_err(|_| malformed())?;

    Ok(Some(Point::new(x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(path: &str, content: &str) {
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_outline_with_hole_and_steiner() {
        let path = "test_zone_file_tmp";
        write_file(
            path,
            "0 0\n10 0\n10 10\n0 10\n\nHOLE\n4 4\n6 4\n6 6\n4 6\nSTEINER\n2 2\n",
        );

        let builder = PlainFileLoader::default().load(path).unwrap();
        let mesh = builder.build().triangulate().unwrap();

        // 10x10 square minus the 2x2 hole
        assert!((mesh.area() - 96.).abs() < 1e-9);
        assert_eq!(mesh.points().len(), 9);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_malformed_line_reported() {
        let path = "test_zone_file_malformed_tmp";
        write_file(path, "0 0\n1 nope\n");

        let result = PlainFileLoader::default().load(path);
        assert!(matches!(
            result,
            Err(LoaderError::Malformed { line: 2, .. })
        ));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = PlainFileLoader::default().load("does_not_exist_tmp");
        assert!(matches!(result, Err(LoaderError::Io(_))));
    }
}
