/// Hexdump an image with 24-bit addresses, `stride` bytes per row, based on
/// <https://skilldrick.github.io/easy6502>
pub fn hexdump(image: &[u8], base: u32, stride: usize) -> String {
    let stride = stride.max(1);
    image
        .chunks(stride)
        .enumerate()
        .map(|(row, bytes)| {
            let addr = base.wrapping_add((row * stride) as u32) & 0xFFFFFF;
            let bytes = bytes
                .iter()
                .map(|byte| format!(" {:02x}", byte))
                .collect::<String>();
            format!("{:06x}:{}", addr, bytes)
        })
        .collect::<Vec<String>>()
        .join("\n")
}
