use std::path::PathBuf;

use crate::foundation::core::InputFile;

/// Keep the paths whose filename ends in `.png` or `.gif`, in input order.
///
/// Everything else is dropped without comment. Nothing here touches the
/// filesystem, so a directory named `foo.png` is kept and fails later, at
/// decode time.
pub fn select_inputs<I, P>(paths: I) -> Vec<InputFile>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    paths.into_iter().filter_map(InputFile::from_path).collect()
}

#[cfg(test)]
#[path = "../../tests/unit/select/filter.rs"]
mod tests;
