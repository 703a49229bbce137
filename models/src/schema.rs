table! {
    users (id) {
        id -> Text,
        phone -> Text,
        email -> Text,
        first_name -> Text,
        last_name -> Text,
        created_at -> Timestamp,
    }
}

table! {
    balances (user_id) {
        user_id -> Text,
        btc_sats -> BigInt,
        usdt_cents -> BigInt,
        updated_at -> Timestamp,
    }
}

table! {
    transactions (id) {
        id -> BigInt,
        from_user_id -> Nullable<Text>,
        to_user_id -> Nullable<Text>,
        amount -> BigInt,
        currency -> Text,
        tx_type -> Text,
        reference -> Text,
        description -> Text,
        created_at -> Timestamp,
    }
}

table! {
    deposits (id) {
        id -> Text,
        user_id -> Text,
        address -> Text,
        currency -> Text,
        expected_amount -> Nullable<BigInt>,
        actual_amount -> Nullable<BigInt>,
        status -> Text,
        external_reference -> Nullable<Text>,
        created_at -> Timestamp,
        confirmed_at -> Nullable<Timestamp>,
    }
}

joinable!(balances -> users (user_id));
joinable!(deposits -> users (user_id));

allow_tables_to_appear_in_same_query!(balances, deposits, transactions, users,);
