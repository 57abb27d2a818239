// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_flat_markup(size: usize) -> String {
    let base = "x^2+2xy-\\frac{1}{2}\\pi r^2\\times\\sqrt{a_1}+";
    let mut markup = base.repeat(size);
    markup.push('1');
    markup
}

#[allow(dead_code)]
pub fn generate_nested_markup(depth: usize) -> String {
    let mut markup = String::from("x");
    for level in 0..depth {
        markup = format!("\\frac{{{markup}+{level}}}{{\\sqrt{{y_{level}}}}}");
    }
    markup
}
