//! Pretty printing utilities for index notation.
//!
//! `Display` renders a statement on one line; `PrettyPrint` lays nested
//! loops and where-clauses out over several lines.

use pretty::{DocAllocator, DocBuilder, BoxAllocator};
use std::fmt;

/// Default line width for pretty printing.
pub const DEFAULT_WIDTH: usize = 80;

/// A pretty-printable value.
pub trait PrettyPrint {
    /// Convert to a pretty document.
    fn to_doc<'a, D: DocAllocator<'a>>(&self, allocator: &'a D) -> DocBuilder<'a, D>;

    /// Pretty print to a string with the given width.
    fn pretty_print(&self, width: usize) -> String {
        let allocator = BoxAllocator;
        let doc = self.to_doc(&allocator);
        let mut output = String::new();
        doc.render_fmt(width, &mut output)
            .expect("rendering into a String cannot fail");
        output
    }

    /// Pretty print with default width.
    fn pretty(&self) -> String {
        self.pretty_print(DEFAULT_WIDTH)
    }
}

/// Format a list with separators.
pub fn format_list<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Loop;

    impl PrettyPrint for Loop {
        fn to_doc<'a, D: DocAllocator<'a>>(&self, allocator: &'a D) -> DocBuilder<'a, D> {
            allocator
                .text("forall(i,")
                .append(allocator.line())
                .append(allocator.text("a(i) = b(i))"))
                .group()
        }
    }

    #[test]
    fn test_pretty_print_width() {
        assert_eq!(Loop.pretty(), "forall(i, a(i) = b(i))");
        assert_eq!(Loop.pretty_print(8), "forall(i,\na(i) = b(i))");
    }

    #[test]
    fn test_format_list() {
        assert_eq!(format_list(&[1, 2, 3], ","), "1,2,3");
        assert_eq!(format_list::<i32>(&[], ","), "");
    }
}
