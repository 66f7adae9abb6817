mod chats;
mod helpers;
mod mocks;
mod reviews;
