use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 通知メッセージ（宛先・件名・本文）
///
/// 配信サイクル内で生成され、通知ゲートウェイに渡されるだけの一時的な値。
/// 送信時刻はゲートウェイが記録する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// 自動リマインダー：返却期限が明日の貸出
pub fn due_tomorrow_reminder(borrower_name: &str, borrower_email: &str, book_title: &str) -> Reminder {
    Reminder {
        recipient: borrower_email.to_string(),
        subject: "Automatic reminder: book due tomorrow".to_string(),
        body: format!(
            "Dear {borrower_name},\n\n\
             This is a reminder that your book '{book_title}' is due tomorrow. \
             Please return it to avoid late fees.\n\n\
             Thank you,\nYour Library"
        ),
    }
}

/// 手動の延滞通知：返却期限を過ぎた貸出
pub fn overdue_notice(
    borrower_name: &str,
    borrower_email: &str,
    book_title: &str,
    due_date: NaiveDate,
) -> Reminder {
    Reminder {
        recipient: borrower_email.to_string(),
        subject: "Overdue notice: book past due".to_string(),
        body: format!(
            "Dear {borrower_name},\n\n\
             Your book '{book_title}' was due on {due_date} and is now overdue. \
             Please return it as soon as possible.\n\n\
             Thank you,\nYour Library"
        ),
    }
}
