// Assign display colors from a fixed palette based on participant ID
pub fn generate_color(participant_id: u32) -> String {
    let colors = [
        "crimson", "royalblue", "limegreen", "violet", "orange", "teal", "magenta", "gold",
    ];
    colors[(participant_id as usize).wrapping_sub(1) % colors.len()].to_string()
}
