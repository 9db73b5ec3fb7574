/// 사용자 조회
pub const GET_USER: &str =
    "SELECT id, public_address, username, discord_name, created_at FROM users WHERE id = $1";

/// 경매 조회
pub const GET_AUCTION: &str = "SELECT id, title, description, image_url, start_date, expires_at, max_expiry_date, max_claim_date, number_of_winners, current_bid, bid_step, bid_fee, created_at FROM auctions WHERE id = $1";

/// 모든 경매 조회 (만료 임박 순)
pub const GET_ALL_AUCTIONS: &str =
    "SELECT id, title, description, image_url, start_date, expires_at, max_expiry_date, max_claim_date, number_of_winners, current_bid, bid_step, bid_fee, created_at FROM auctions ORDER BY expires_at ASC, id ASC";

/// 구간 내 만료된 경매 조회
pub const GET_AUCTIONS_EXPIRED_BETWEEN: &str = "SELECT id, title, description, image_url, start_date, expires_at, max_expiry_date, max_claim_date, number_of_winners, current_bid, bid_step, bid_fee, created_at FROM auctions WHERE expires_at > $1 AND expires_at <= $2 ORDER BY expires_at ASC";

/// 입찰 반영 (낙관적 업데이트: current_bid 가 읽은 값 그대로이고 아직 만료 전일 때만)
pub const UPDATE_AUCTION_BID: &str = "UPDATE auctions SET current_bid = $1, expires_at = $2
     WHERE id = $3 AND current_bid = $4 AND expires_at > $5
     RETURNING id, title, description, image_url, start_date, expires_at, max_expiry_date, max_claim_date, number_of_winners, current_bid, bid_step, bid_fee, created_at";

/// 입찰 기록 (경매당 사용자 한 건)
pub const UPSERT_AUCTION_BID: &str = r#"
    INSERT INTO auction_bids (auction_id, user_id, value, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $4)
    ON CONFLICT (auction_id, user_id)
    DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
"#;

/// 정렬된 입찰 조회 (높은 금액, 먼저 도달한 순)
pub const GET_SORTED_AUCTION_BIDS: &str = r#"
    SELECT b.id, b.auction_id, b.user_id, u.username, b.value, b.claim_transaction_id, b.created_at, b.updated_at
    FROM auction_bids b
    JOIN users u ON u.id = b.user_id
    WHERE b.auction_id = $1
    ORDER BY b.value DESC, b.updated_at ASC, b.id ASC
    LIMIT $2
"#;

/// 입찰 조회
pub const GET_AUCTION_BID: &str = "SELECT id, auction_id, user_id, value, claim_transaction_id, created_at, updated_at FROM auction_bids WHERE id = $1";

/// 이체 전 클레임 예약 (한 번만)
pub const RESERVE_CLAIM: &str = "UPDATE auction_bids SET claim_transaction_id = $2 WHERE id = $1 AND claim_transaction_id IS NULL";

/// 예약된 클레임 해제
pub const RELEASE_CLAIM: &str =
    "UPDATE auction_bids SET claim_transaction_id = NULL WHERE id = $1 AND claim_transaction_id = $2";

/// 예약 표시를 실제 트랜잭션 id 로 교체
pub const SET_CLAIM_TRANSACTION: &str =
    "UPDATE auction_bids SET claim_transaction_id = $3 WHERE id = $1 AND claim_transaction_id = $2";

/// 지급 생성
pub const INSERT_PAYOUT: &str = r#"
    INSERT INTO payouts (auction_id, user_id, public_address, status)
    VALUES ($1, $2, $3, $4)
    RETURNING id, auction_id, user_id, public_address, status, created_at, processed_at
"#;

/// 지급 처리 완료
pub const MARK_PAYOUT_PROCESSED: &str = r#"
    UPDATE payouts SET status = $3, processed_at = $2
    WHERE id = $1
    RETURNING id, auction_id, user_id, public_address, status, created_at, processed_at
"#;

/// 설정 조회
pub const GET_SETTING: &str = "SELECT value FROM settings WHERE key = $1";

/// 설정 저장
pub const UPSERT_SETTING: &str = r#"
    INSERT INTO settings (key, value) VALUES ($1, $2)
    ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
"#;
