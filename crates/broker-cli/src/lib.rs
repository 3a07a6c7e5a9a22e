//! 브로커 연결 관리자 CLI 도구.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 명령줄 인자를 등록 필드로 변환
//! - 작업 결과 출력 (사람용 텍스트 또는 JSON)

pub mod commands;
