//! Re-attaching compiled figures to converted HTML.
//!
//! pandoc cannot render TikZ, so a converted `figure` environment comes out
//! as an empty slot:
//!
//! ```html
//! <figure>
//!
//! <figcaption>Caption</figcaption>
//! </figure>
//! ```
//!
//! Two strategies put the images back:
//!
//! - **position** ([`inject_by_position`]): the k-th empty slot receives the
//!   k-th compiled figure. Matching is by index only. When a figure fails to
//!   compile, or pandoc emits slots in a different order than the source,
//!   every later image lands under the wrong caption.
//! - **marker** ([`mark_figures`] + [`inject_by_marker`]): compiled figures
//!   are swapped for `\includegraphics{tikz-fig-N.svg}` before conversion,
//!   and the resulting `<img>` tags are rewritten by figure id afterwards.

use super::{compile::CompiledFigure, figure::FigureBlock};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// An opening `<figure>` followed only by blank lines and the caption.
static RE_EMPTY_SLOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(<figure[^>]*>)\s*\n\s*\n\s*(<figcaption>)").unwrap()
});

/// An `<img>` produced from a marker inserted by [`mark_figures`].
static RE_MARKER_IMG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<img\b[^>]*?\bsrc="tikz-fig-(\d+)\.svg"[^>]*>"#).unwrap()
});

const IMG_STYLE: &str = "max-width: 100%; height: auto; display: block; margin: 0 auto;";

/// File name a compiled figure is referenced by in marked source.
pub fn marker_name(id: usize) -> String {
    format!("tikz-fig-{id}.svg")
}

fn img_tag(url: &str, alt: &str) -> String {
    format!(r#"<img src="{url}" alt="{alt}" style="{IMG_STYLE}" />"#)
}

/// Fill empty figure slots, in order, with compiled figures, in order.
///
/// Extra slots stay empty and extra figures go unused. Returns the new HTML
/// and the number of slots filled.
pub fn inject_by_position(html: &str, figures: &[CompiledFigure], alt: &str) -> (String, usize) {
    let mut next = figures.iter();
    let mut filled = 0;

    let html = RE_EMPTY_SLOT.replace_all(html, |caps: &Captures<'_>| match next.next() {
        Some(figure) => {
            filled += 1;
            format!("{}\n{}\n{}", &caps[1], img_tag(&figure.url, alt), &caps[2])
        }
        None => caps[0].to_owned(),
    });

    (html.into_owned(), filled)
}

/// Replace each compiled figure's block in `source` with an
/// `\includegraphics` marker carrying its id.
///
/// Blocks whose figure did not compile are left as written.
pub fn mark_figures(source: &str, blocks: &[FigureBlock], compiled: &[CompiledFigure]) -> String {
    let mut out = String::with_capacity(source.len());
    let mut last = 0;

    for block in blocks {
        if !compiled.iter().any(|f| f.id == block.id) {
            continue;
        }
        out.push_str(&source[last..block.span.start]);
        out.push_str("\\includegraphics{");
        out.push_str(&marker_name(block.id));
        out.push('}');
        last = block.span.end;
    }
    out.push_str(&source[last..]);
    out
}

/// Rewrite marker images to the compiled figures' public URLs.
///
/// Returns the new HTML and the number of images rewritten.
pub fn inject_by_marker(html: &str, figures: &[CompiledFigure], alt: &str) -> (String, usize) {
    let mut filled = 0;

    let html = RE_MARKER_IMG.replace_all(html, |caps: &Captures<'_>| {
        let figure = caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|id| figures.iter().find(|f| f.id == id));
        match figure {
            Some(figure) => {
                filled += 1;
                img_tag(&figure.url, alt)
            }
            None => caps[0].to_owned(),
        }
    });

    (html.into_owned(), filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latex::figure::extract_figures;
    use std::path::PathBuf;

    const ALT: &str = "TikZ Diagram";

    fn compiled(id: usize) -> CompiledFigure {
        CompiledFigure {
            id,
            path: PathBuf::from(format!("generated/blogs/tikz/post/fig-{id}.svg")),
            url: format!("/generated/blogs/tikz/post/fig-{id}.svg"),
        }
    }

    fn slot(caption: &str) -> String {
        format!("<figure>\n\n<figcaption>{caption}</figcaption>\n</figure>\n")
    }

    fn filled(caption: &str, id: usize) -> String {
        format!(
            "<figure>\n<img src=\"/generated/blogs/tikz/post/fig-{id}.svg\" alt=\"TikZ Diagram\" style=\"{IMG_STYLE}\" />\n<figcaption>{caption}</figcaption>\n</figure>\n"
        )
    }

    // ------------------------------------------------------------------------
    // position
    // ------------------------------------------------------------------------

    #[test]
    fn test_position_fills_slots_in_order() {
        let html = format!("<p>a</p>\n{}{}", slot("First"), slot("Second"));
        let (out, n) = inject_by_position(&html, &[compiled(0), compiled(1)], ALT);
        assert_eq!(n, 2);
        assert_eq!(out, format!("<p>a</p>\n{}{}", filled("First", 0), filled("Second", 1)));
    }

    #[test]
    fn test_position_fewer_figures_than_slots() {
        let html = format!("{}{}{}", slot("A"), slot("B"), slot("C"));
        let (out, n) = inject_by_position(&html, &[compiled(0)], ALT);
        assert_eq!(n, 1);
        assert_eq!(out, format!("{}{}{}", filled("A", 0), slot("B"), slot("C")));
    }

    #[test]
    fn test_position_more_figures_than_slots() {
        let html = slot("Only");
        let (out, n) = inject_by_position(&html, &[compiled(0), compiled(1), compiled(2)], ALT);
        assert_eq!(n, 1);
        assert_eq!(out, filled("Only", 0));
    }

    #[test]
    fn test_position_is_index_based_not_id_based() {
        // Two figures, only the second compiled: its image attaches to the
        // first slot's caption and the second slot stays empty.
        let html = format!("{}{}", slot("Figure one"), slot("Figure two"));
        let (out, n) = inject_by_position(&html, &[compiled(1)], ALT);
        assert_eq!(n, 1);
        assert_eq!(out, format!("{}{}", filled("Figure one", 1), slot("Figure two")));
    }

    #[test]
    fn test_position_ignores_non_empty_figures() {
        let html = format!(
            "<figure id=\"f\">\n<img src=\"photo.png\" />\n<figcaption>Photo</figcaption>\n</figure>\n{}",
            slot("Diagram")
        );
        let (out, n) = inject_by_position(&html, &[compiled(0)], ALT);
        assert_eq!(n, 1);
        assert!(out.contains("<img src=\"photo.png\" />"));
        assert!(out.ends_with(&filled("Diagram", 0)));
    }

    #[test]
    fn test_position_keeps_figure_attributes() {
        let html = "<figure id=\"fig:arch\" class=\"wide\">\n  \n\n  <figcaption>Arch</figcaption></figure>";
        let (out, n) = inject_by_position(html, &[compiled(0)], ALT);
        assert_eq!(n, 1);
        assert!(out.starts_with("<figure id=\"fig:arch\" class=\"wide\">\n<img src=\"/generated/blogs/tikz/post/fig-0.svg\""));
        assert!(out.ends_with("/>\n<figcaption>Arch</figcaption></figure>"));
    }

    #[test]
    fn test_position_single_newline_is_not_a_slot() {
        let html = "<figure>\n<figcaption>Tight</figcaption></figure>";
        let (out, n) = inject_by_position(html, &[compiled(0)], ALT);
        assert_eq!(n, 0);
        assert_eq!(out, html);
    }

    #[test]
    fn test_position_no_figures() {
        let html = slot("A");
        assert_eq!(inject_by_position(&html, &[], ALT), (html.clone(), 0));
    }

    // ------------------------------------------------------------------------
    // marker
    // ------------------------------------------------------------------------

    const SOURCE: &str = "\\begin{figure}\n\\begin{tikzpicture}\\draw (0,0);\\end{tikzpicture}\n\\caption{One}\n\\end{figure}\n\\begin{figure}\n\\begin{tikzpicture}\\draw (1,1);\\end{tikzpicture}\n\\caption{Two}\n\\end{figure}\n";

    #[test]
    fn test_mark_figures_only_compiled() {
        let blocks = extract_figures(SOURCE);
        let marked = mark_figures(SOURCE, &blocks, &[compiled(1)]);
        assert!(marked.contains("\\begin{tikzpicture}\\draw (0,0);\\end{tikzpicture}"));
        assert!(!marked.contains("\\draw (1,1)"));
        assert!(marked.contains("\\includegraphics{tikz-fig-1.svg}\n\\caption{Two}"));
    }

    #[test]
    fn test_mark_figures_all_compiled() {
        let blocks = extract_figures(SOURCE);
        let marked = mark_figures(SOURCE, &blocks, &[compiled(0), compiled(1)]);
        assert!(!marked.contains("tikzpicture"));
        assert_eq!(marked.matches("\\includegraphics{").count(), 2);
        assert!(marked.starts_with("\\begin{figure}\n\\includegraphics{tikz-fig-0.svg}\n"));
    }

    #[test]
    fn test_mark_figures_none_compiled() {
        let blocks = extract_figures(SOURCE);
        assert_eq!(mark_figures(SOURCE, &blocks, &[]), SOURCE);
    }

    #[test]
    fn test_marker_matches_by_id() {
        // first figure failed: its slot stays empty, the second keeps its caption
        let html = format!(
            "{}<figure>\n<img src=\"tikz-fig-1.svg\" alt=\"Two\" />\n<figcaption>Two</figcaption>\n</figure>\n",
            slot("One")
        );
        let (out, n) = inject_by_marker(&html, &[compiled(1)], ALT);
        assert_eq!(n, 1);
        assert_eq!(out, format!("{}{}", slot("One"), filled("Two", 1)));
    }

    #[test]
    fn test_marker_unknown_id_left_alone() {
        let html = "<img src=\"tikz-fig-7.svg\" />";
        let (out, n) = inject_by_marker(html, &[compiled(0)], ALT);
        assert_eq!(n, 0);
        assert_eq!(out, html);
    }

    #[test]
    fn test_marker_ignores_other_images() {
        let html = "<img src=\"assets/fig-1.svg\" /><img src=\"tikz-fig-0.svg\" />";
        let (out, n) = inject_by_marker(html, &[compiled(0)], ALT);
        assert_eq!(n, 1);
        assert!(out.starts_with("<img src=\"assets/fig-1.svg\" /><img src=\"/generated/blogs/tikz/post/fig-0.svg\""));
    }
}
