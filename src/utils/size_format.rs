/// 字节大小单位（以 1024 进位）
const UNITS: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// 默认保留的小数位数
pub const DEFAULT_DECIMALS: usize = 2;

/// 格式化字节大小为友好显示格式 (例如: "2 KB", "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    format_bytes_with(bytes, DEFAULT_DECIMALS)
}

/// 使用指定小数位数格式化字节大小
///
/// 数值先按小数位数四舍五入，再去掉多余的尾随零，
/// 因此 2048 显示为 "2 KB" 而不是 "2.00 KB"。
pub fn format_bytes_with(bytes: u64, decimals: usize) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let index = unit_index(bytes);
    let scaled = bytes as f64 / 1024f64.powi(index as i32);

    // 恰好落在中间的值向远离零的方向舍入（1.125 -> 1.13），
    // `{:.*}` 会舍入到偶数位，因此不能直接使用
    let factor = 10f64.powi(decimals as i32);
    let value = (scaled * factor).round() / factor;

    format!("{} {}", value, UNITS[index])
}

/// 计算单位下标，即 floor(log1024(bytes))
pub fn unit_index(bytes: u64) -> usize {
    let mut index = 0;
    let mut remaining = bytes;
    while remaining >= 1024 && index < UNITS.len() - 1 {
        remaining /= 1024;
        index += 1;
    }
    index
}
