//! Minimal SVG writer with the handful of shapes the map renderer draws.

pub struct SvgCanvas {
    out: String,
    open_groups: usize,
}

impl SvgCanvas {
    pub fn start(width: i32, height: i32) -> Self {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\"?>\n");
        out.push_str(&format!(
            "<svg width=\"{width}\" height=\"{height}\" xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">\n"
        ));
        Self {
            out,
            open_groups: 0,
        }
    }

    pub fn rect(&mut self, x: i32, y: i32, width: i32, height: i32, style: &str) {
        self.out.push_str(&format!(
            "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" style=\"{}\" />\n",
            escape_xml(style)
        ));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn round_rect(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        rx: i32,
        ry: i32,
        style: &str,
    ) {
        self.out.push_str(&format!(
            "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" rx=\"{rx}\" ry=\"{ry}\" style=\"{}\" />\n",
            escape_xml(style)
        ));
    }

    pub fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, style: &str) {
        self.out.push_str(&format!(
            "<line x1=\"{x1}\" y1=\"{y1}\" x2=\"{x2}\" y2=\"{y2}\" style=\"{}\" />\n",
            escape_xml(style)
        ));
    }

    pub fn text(&mut self, x: i32, y: i32, content: &str, style: &str) {
        self.out.push_str(&format!(
            "<text x=\"{x}\" y=\"{y}\" style=\"{}\">{}</text>\n",
            escape_xml(style),
            escape_xml(content)
        ));
    }

    pub fn group(&mut self, id: &str) {
        self.out
            .push_str(&format!("<g id=\"{}\">\n", escape_xml(id)));
        self.open_groups += 1;
    }

    pub fn end_group(&mut self) {
        if self.open_groups > 0 {
            self.out.push_str("</g>\n");
            self.open_groups -= 1;
        }
    }

    /// Closes any groups still open and the document itself.
    pub fn finish(mut self) -> String {
        while self.open_groups > 0 {
            self.end_group();
        }
        self.out.push_str("</svg>\n");
        self.out
    }
}

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
