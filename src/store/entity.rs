pub mod word_pair {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "word_pairs")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub category: String,
        pub innocent_word: String,
        pub mole_word: String,
        pub difficulty: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod daily_setup {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "daily_setup")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        // YYYY-MM-DD，每天只允许一行
        #[sea_orm(unique)]
        pub date: String,
        pub word_pair_id: i32,
        pub mole_model: String,
        // JSON 数组
        #[sea_orm(column_type = "Text")]
        pub turn_order: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod game_state {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "game_states")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub state_hash: String,
        pub date: String,
        pub round_number: i32,
        #[sea_orm(column_type = "Text")]
        pub remaining_models: String,
        pub action: String,
        pub eliminated_model: Option<String>,
        #[sea_orm(column_type = "Text")]
        pub dialogues: String,
        pub game_over: bool,
        pub winner: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
