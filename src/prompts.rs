//! Prompts for the handover-record extraction call.
//!
//! The JSON keys named here (`shd`, `shd_type`, `cty`, `ds`, `ttb`, `model`,
//! `hang`, `nsx`, `dvt`, `sl`, `seri`, `pk`) are the contract with
//! [`crate::record::ExtractedRecord::from_json`]. Change both together.
//!
//! Callers can override the system instruction via
//! [`crate::config::HandoverConfig::system_prompt`]; the extraction prompt
//! itself is fixed.

/// Default system instruction.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"Bạn là chuyên viên phân tích tài liệu kỹ thuật, chuyên đọc "Biên bản giao nhận - Nghiệm thu kiêm phiếu bảo hành" và các biên bản bàn giao thiết bị tương tự.

Quy tắc:
1. Đọc toàn bộ các trang được gửi kèm, đặc biệt là bảng danh sách thiết bị.
2. Với mỗi dòng thiết bị: tên thiết bị lấy từ cột MÔ TẢ, model lấy từ cột MÃ HÀNG, số seri lấy từ cột IMEI/SERIAL, kèm đơn vị tính, số lượng và phụ kiện hoặc cấu hình đi kèm.
3. Xác định số định danh chính của biên bản (số hợp đồng, số PO, mã đề nghị...) và loại của số đó dựa vào cụm từ đứng trước nó.
4. Xác định tên đầy đủ của công ty bên giao (Bên A).
5. Chép nguyên văn những gì in trên tài liệu, không tự suy đoán hay bổ sung.
6. Chỉ trả về một đối tượng JSON đúng cấu trúc được yêu cầu, không kèm giải thích."#;

/// Extraction prompt sent with the page images.
pub const EXTRACTION_PROMPT: &str = r#"Trả về dữ liệu dạng JSON với các khóa viết tắt sau:
- shd: số định danh chính của biên bản (số hợp đồng, số đề xuất, mã đề nghị hoặc số PO), chỉ một giá trị.
- shd_type: loại của số định danh: "Hợp đồng", "PO", "Đề nghị" hoặc "Khác". Dựa vào các cụm như "HĐ số:", "Theo HĐ số:", "Số Hợp Đồng:", "PO số:", "Số PO:", "Mã đề nghị:", "Số đề xuất:". Không rõ thì dùng "Khác".
- cty: tên công ty bên giao, chỉ một giá trị.
- ds: danh sách thiết bị; mỗi phần tử là một đối tượng gồm:
  - ttb: tên thiết bị
  - model: model / mã hàng
  - hang: hãng
  - nsx: nước sản xuất
  - dvt: đơn vị tính
  - sl: số lượng
  - seri: số seri; nhiều seri cho một dòng thì dùng mảng, một seri thì dùng chuỗi, không có thì null
  - pk: phụ kiện hoặc cấu hình đi kèm, dạng chuỗi, nhiều dòng thì nối bằng '\n', không có thì null

Cấu trúc mẫu:
{
  "shd": "...",
  "shd_type": "Hợp đồng",
  "cty": "...",
  "ds": [
    {
      "ttb": "...",
      "model": "...",
      "hang": "...",
      "nsx": "...",
      "dvt": "...",
      "sl": "...",
      "seri": ["...", "..."],
      "pk": "Gồm:\n- Phụ kiện A\n- Phụ kiện B"
    }
  ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_names_every_key() {
        for key in [
            "shd", "shd_type", "cty", "ds", "ttb", "model", "hang", "nsx", "dvt", "sl", "seri",
            "pk",
        ] {
            assert!(
                EXTRACTION_PROMPT.contains(&format!("{key}:")),
                "missing key {key}"
            );
        }
    }

    #[test]
    fn system_prompt_asks_for_json_only() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("JSON"));
    }
}
