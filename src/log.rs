use color_print::cformat;

pub fn info(message: &str) {
    eprintln!("{}", cformat!("<green, bold>info:</green, bold> {}", message));
}

pub fn error(message: &str) {
    eprintln!("{}", cformat!("<red, bold>error:</red, bold> {}", message));
}

// class letter, rank and local clock prefix every transition line
pub fn state(class: char, rank: usize, clock: u64, phase: &str) {
    eprintln!(
        "{}",
        cformat!("<cyan, bold>[{}{} @{}]</cyan, bold> {}", class, rank, clock, phase)
    );
}
